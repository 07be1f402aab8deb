//! Collapse arbitrarily nested field and permission trees into flat, addressable option lists.

use crate::schema::{FieldPermission, FieldPermissionTree, FieldType, PayloadField};
use serde::Serialize;
use serde_json::Value;

/// One entry of a host option list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatOption {
    pub name: String,
    pub value: Value,
}

impl FlatOption {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Entry whose label and value are the same text.
    pub fn same(text: &str) -> Self {
        Self::new(text, Value::String(text.to_string()))
    }
}

pub fn join_path(parent: &str, name: &str) -> String {
    match (parent.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{}.{}", parent, name),
    }
}

/// Flatten one schema field under `parent` (empty for top level).
///
/// Labels are fully qualified dotted paths. Plain leaves use the short field name as value,
/// since the query language addresses leaves relative to their parent.
pub fn flatten_field(field: &PayloadField, parent: &str) -> Vec<FlatOption> {
    let path = join_path(parent, &field.name);
    match &field.field_type {
        FieldType::Select | FieldType::Radio => field
            .options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|option| FlatOption::new(format!("{}: {}", path, option.display()), option.value()))
            .collect(),
        FieldType::Checkbox => vec![
            FlatOption::new(format!("{}: True", path), Value::Bool(true)),
            FlatOption::new(format!("{}: False", path), Value::Bool(false)),
        ],
        FieldType::Point => vec![
            FlatOption::new(format!("{}.lat", path), Value::String("lat".to_string())),
            FlatOption::new(format!("{}.lng", path), Value::String("lng".to_string())),
        ],
        kind if kind.is_composite() => flatten_fields(field.fields.as_deref().unwrap_or_default(), &path),
        _ => vec![FlatOption::new(path, Value::String(field.name.clone()))],
    }
}

pub fn flatten_fields(fields: &[PayloadField], parent: &str) -> Vec<FlatOption> {
    fields
        .iter()
        .flat_map(|field| flatten_field(field, parent))
        .collect()
}

/// Dotted paths of every addressable leaf in a permission tree. A bare "all fields" tree
/// names no individual field and yields nothing.
pub fn flatten_permissions(tree: &FieldPermissionTree, parent: &str) -> Vec<FlatOption> {
    let FieldPermissionTree::Fields(fields) = tree else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (name, permission) in fields {
        let path = join_path(parent, name);
        walk_permission(permission, &path, &mut out);
    }
    out
}

fn walk_permission(permission: &FieldPermission, path: &str, out: &mut Vec<FlatOption>) {
    let FieldPermission::Node(node) = permission else {
        out.push(FlatOption::same(path));
        return;
    };
    if permission.is_terminal() {
        out.push(FlatOption::same(path));
        return;
    }
    if let Some(tree) = &node.fields {
        out.extend(flatten_permissions(tree, path));
    }
    if let Some(blocks) = &node.blocks {
        for (slug, block) in blocks {
            walk_permission(block, &join_path(path, slug), out);
        }
    }
}
