use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field type tag. Unrecognized tags deserialize to `Other` and are flattened as plain leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Array,
    Blocks,
    Checkbox,
    Code,
    Collapsible,
    Date,
    Email,
    Group,
    Join,
    Json,
    Number,
    Point,
    Radio,
    Relationship,
    RichText,
    Row,
    Select,
    Tabs,
    Text,
    Textarea,
    Ui,
    Upload,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Array => "array",
            FieldType::Blocks => "blocks",
            FieldType::Checkbox => "checkbox",
            FieldType::Code => "code",
            FieldType::Collapsible => "collapsible",
            FieldType::Date => "date",
            FieldType::Email => "email",
            FieldType::Group => "group",
            FieldType::Join => "join",
            FieldType::Json => "json",
            FieldType::Number => "number",
            FieldType::Point => "point",
            FieldType::Radio => "radio",
            FieldType::Relationship => "relationship",
            FieldType::RichText => "richText",
            FieldType::Row => "row",
            FieldType::Select => "select",
            FieldType::Tabs => "tabs",
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Ui => "ui",
            FieldType::Upload => "upload",
            FieldType::Other(tag) => tag,
        }
    }

    /// Kinds whose own node is never addressable; only their sub-fields are.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            FieldType::Array | FieldType::Group | FieldType::Row | FieldType::Tabs | FieldType::Blocks
        )
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "array" => FieldType::Array,
            "blocks" => FieldType::Blocks,
            "checkbox" => FieldType::Checkbox,
            "code" => FieldType::Code,
            "collapsible" => FieldType::Collapsible,
            "date" => FieldType::Date,
            "email" => FieldType::Email,
            "group" => FieldType::Group,
            "join" => FieldType::Join,
            "json" => FieldType::Json,
            "number" => FieldType::Number,
            "point" => FieldType::Point,
            "radio" => FieldType::Radio,
            "relationship" => FieldType::Relationship,
            "richText" => FieldType::RichText,
            "row" => FieldType::Row,
            "select" => FieldType::Select,
            "tabs" => FieldType::Tabs,
            "text" => FieldType::Text,
            "textarea" => FieldType::Textarea,
            "ui" => FieldType::Ui,
            "upload" => FieldType::Upload,
            _ => FieldType::Other(tag),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

/// Declared choice of a select/radio field: either a bare string or `{label, value}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectOption {
    Bare(String),
    Labeled {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        value: Value,
    },
}

impl SelectOption {
    pub fn value(&self) -> Value {
        match self {
            SelectOption::Bare(text) => Value::String(text.clone()),
            SelectOption::Labeled { value, .. } => value.clone(),
        }
    }

    pub fn display(&self) -> String {
        match self {
            SelectOption::Bare(text) => text.clone(),
            SelectOption::Labeled {
                label: Some(label), ..
            } => label.clone(),
            SelectOption::Labeled { value, .. } => match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadField {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<PayloadField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
}

impl PayloadField {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: false,
            fields: None,
            options: None,
        }
    }

    pub fn with_fields(mut self, fields: Vec<PayloadField>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(options);
        self
    }
}
