use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A capability flag as reported by the reflection endpoint: either a bare boolean or
/// `{ "permission": bool, ... }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCapability", into = "bool")]
pub struct Capability(pub bool);

impl Capability {
    pub fn allowed(self) -> bool {
        self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCapability {
    Flag(bool),
    Detailed {
        #[serde(default)]
        permission: bool,
    },
}

impl From<RawCapability> for Capability {
    fn from(raw: RawCapability) -> Self {
        match raw {
            RawCapability::Flag(flag) => Capability(flag),
            RawCapability::Detailed { permission } => Capability(permission),
        }
    }
}

impl From<Capability> for bool {
    fn from(value: Capability) -> Self {
        value.0
    }
}

fn allowed(flag: Option<Capability>) -> bool {
    flag.map(Capability::allowed).unwrap_or(false)
}

/// Field permissions of a collection, global, nested field or block.
///
/// `true` on the wire means every field is permitted. `false` is kept as an empty mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTree", into = "RawTree")]
pub enum FieldPermissionTree {
    All,
    Fields(IndexMap<String, FieldPermission>),
}

impl Default for FieldPermissionTree {
    fn default() -> Self {
        FieldPermissionTree::All
    }
}

impl FieldPermissionTree {
    pub fn is_all(&self) -> bool {
        matches!(self, FieldPermissionTree::All)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawTree {
    Flag(bool),
    Map(IndexMap<String, FieldPermission>),
}

impl From<RawTree> for FieldPermissionTree {
    fn from(raw: RawTree) -> Self {
        match raw {
            RawTree::Flag(true) => FieldPermissionTree::All,
            RawTree::Flag(false) => FieldPermissionTree::Fields(IndexMap::new()),
            RawTree::Map(map) => FieldPermissionTree::Fields(map),
        }
    }
}

impl From<FieldPermissionTree> for RawTree {
    fn from(tree: FieldPermissionTree) -> Self {
        match tree {
            FieldPermissionTree::All => RawTree::Flag(true),
            FieldPermissionTree::Fields(map) => RawTree::Map(map),
        }
    }
}

/// Per-field permission node. Composite fields carry nested `fields` and, for block
/// fields, one nested node per block slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldPermission {
    All(bool),
    Node(FieldNode),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldPermissionTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<IndexMap<String, FieldPermission>>,
}

impl FieldPermission {
    /// Terminal nodes have nothing below them to address.
    pub fn is_terminal(&self) -> bool {
        match self {
            FieldPermission::All(_) => true,
            FieldPermission::Node(node) => {
                let no_fields = match &node.fields {
                    None | Some(FieldPermissionTree::All) => true,
                    Some(FieldPermissionTree::Fields(map)) => map.is_empty(),
                };
                let no_blocks = node.blocks.as_ref().map(IndexMap::is_empty).unwrap_or(true);
                no_fields && no_blocks
            }
        }
    }

    pub fn can_read(&self) -> bool {
        match self {
            FieldPermission::All(flag) => *flag,
            FieldPermission::Node(node) => node.read.map(Capability::allowed).unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPermission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Capability>,
    #[serde(
        default,
        rename = "readVersions",
        skip_serializing_if = "Option::is_none"
    )]
    pub read_versions: Option<Capability>,
    #[serde(default)]
    pub fields: FieldPermissionTree,
    /// Present on auth-enabled collections when the server reports it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auth: bool,
}

impl CollectionPermission {
    pub fn readable(permitted: bool) -> Self {
        Self {
            create: None,
            read: Some(Capability(permitted)),
            update: None,
            delete: None,
            read_versions: None,
            fields: FieldPermissionTree::All,
            auth: false,
        }
    }

    pub fn can_create(&self) -> bool {
        allowed(self.create)
    }

    pub fn can_read(&self) -> bool {
        allowed(self.read)
    }

    pub fn can_update(&self) -> bool {
        allowed(self.update)
    }

    pub fn can_delete(&self) -> bool {
        allowed(self.delete)
    }

    pub fn can_read_versions(&self) -> bool {
        allowed(self.read_versions)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalPermission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<Capability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Capability>,
    #[serde(
        default,
        rename = "readVersions",
        skip_serializing_if = "Option::is_none"
    )]
    pub read_versions: Option<Capability>,
    #[serde(default)]
    pub fields: FieldPermissionTree,
}

impl GlobalPermission {
    pub fn readable(permitted: bool) -> Self {
        Self {
            read: Some(Capability(permitted)),
            update: None,
            read_versions: None,
            fields: FieldPermissionTree::All,
        }
    }

    pub fn can_read(&self) -> bool {
        allowed(self.read)
    }

    pub fn can_update(&self) -> bool {
        allowed(self.update)
    }

    pub fn can_read_versions(&self) -> bool {
        allowed(self.read_versions)
    }
}

/// Everything the reflection endpoint reports, keyed by slug in server order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaGraph {
    pub collections: IndexMap<String, CollectionPermission>,
    pub globals: IndexMap<String, GlobalPermission>,
}

impl SchemaGraph {
    pub fn collection(&self, slug: &str) -> Option<&CollectionPermission> {
        self.collections.get(slug)
    }

    pub fn global(&self, slug: &str) -> Option<&GlobalPermission> {
        self.globals.get(slug)
    }
}
