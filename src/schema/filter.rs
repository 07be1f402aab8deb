use crate::errors::PayloadError;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    Contains,
    NotEquals,
    In,
    All,
    NotIn,
    Exists,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Like,
    NotLike,
    Within,
    Intersects,
    Near,
}

impl Operator {
    pub const ALL: [Operator; 16] = [
        Operator::Equals,
        Operator::Contains,
        Operator::NotEquals,
        Operator::In,
        Operator::All,
        Operator::NotIn,
        Operator::Exists,
        Operator::GreaterThan,
        Operator::GreaterThanEqual,
        Operator::LessThan,
        Operator::LessThanEqual,
        Operator::Like,
        Operator::NotLike,
        Operator::Within,
        Operator::Intersects,
        Operator::Near,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::Contains => "contains",
            Operator::NotEquals => "not_equals",
            Operator::In => "in",
            Operator::All => "all",
            Operator::NotIn => "not_in",
            Operator::Exists => "exists",
            Operator::GreaterThan => "greater_than",
            Operator::GreaterThanEqual => "greater_than_equal",
            Operator::LessThan => "less_than",
            Operator::LessThanEqual => "less_than_equal",
            Operator::Like => "like",
            Operator::NotLike => "not_like",
            Operator::Within => "within",
            Operator::Intersects => "intersects",
            Operator::Near => "near",
        }
    }
}

impl FromStr for Operator {
    type Err = PayloadError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == raw)
            .ok_or_else(|| {
                let known: Vec<&str> = Operator::ALL.iter().map(|op| op.as_str()).collect();
                PayloadError::invalid_params(format!("Unknown where operator: {}", raw))
                    .with_hint(format!("Use one of: {}.", known.join(", ")))
            })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-keyed leaf for a single field path, in caller order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldCondition(pub Vec<(Operator, Value)>);

impl FieldCondition {
    pub fn new(operator: Operator, value: Value) -> Self {
        Self(vec![(operator, value)])
    }
}

/// Boolean filter tree of the remote query language.
///
/// A node is exactly one of `and`, `or`, or a set of field conditions. Nodes that mix
/// these are rejected at parse time instead of guessing a precedence.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    And(Vec<Where>),
    Or(Vec<Where>),
    Fields(IndexMap<String, FieldCondition>),
}

impl Where {
    pub fn field(path: &str, operator: Operator, value: Value) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(path.to_string(), FieldCondition::new(operator, value));
        Where::Fields(fields)
    }

    /// Accepts a structured value or JSON text. Blank text, `null` and `{}` mean no filter.
    pub fn from_input(value: &Value) -> Result<Option<Self>, PayloadError> {
        let parsed = match value {
            Value::Null => return Ok(None),
            Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                let raw: Value = serde_json::from_str(trimmed).map_err(|err| {
                    PayloadError::invalid_params(format!("where must be valid JSON: {}", err))
                })?;
                Self::parse(&raw)?
            }
            other => Self::parse(other)?,
        };
        Ok(if parsed.is_empty() { None } else { Some(parsed) })
    }

    pub fn parse(value: &Value) -> Result<Self, PayloadError> {
        parse_node(value, "where")
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Where::Fields(fields) if fields.is_empty())
    }

    pub fn to_value(&self) -> Value {
        match self {
            Where::And(children) => {
                let mut map = Map::new();
                map.insert(
                    "and".to_string(),
                    Value::Array(children.iter().map(Where::to_value).collect()),
                );
                Value::Object(map)
            }
            Where::Or(children) => {
                let mut map = Map::new();
                map.insert(
                    "or".to_string(),
                    Value::Array(children.iter().map(Where::to_value).collect()),
                );
                Value::Object(map)
            }
            Where::Fields(fields) => {
                let mut map = Map::new();
                for (path, condition) in fields {
                    let mut ops = Map::new();
                    for (operator, operand) in &condition.0 {
                        ops.insert(operator.as_str().to_string(), operand.clone());
                    }
                    map.insert(path.clone(), Value::Object(ops));
                }
                Value::Object(map)
            }
        }
    }

    /// Compact JSON text, as sent in the `where` query parameter.
    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }
}

impl Serialize for Where {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

fn parse_node(value: &Value, path: &str) -> Result<Where, PayloadError> {
    let obj = value
        .as_object()
        .ok_or_else(|| PayloadError::invalid_params(format!("{} must be an object", path)))?;

    let has_and = obj.contains_key("and");
    let has_or = obj.contains_key("or");
    let field_keys = obj.keys().filter(|k| *k != "and" && *k != "or").count();
    if (has_and && has_or) || ((has_and || has_or) && field_keys > 0) {
        return Err(PayloadError::invalid_params(format!(
            "{} mixes and/or with other conditions",
            path
        ))
        .with_hint("Wrap sibling conditions in a single {\"and\": [...]} or {\"or\": [...]}."));
    }

    if has_and {
        return parse_children(&obj["and"], &format!("{}.and", path)).map(Where::And);
    }
    if has_or {
        return parse_children(&obj["or"], &format!("{}.or", path)).map(Where::Or);
    }

    let mut fields = IndexMap::new();
    for (field, condition) in obj {
        let label = format!("{}.{}", path, field);
        let ops = condition.as_object().ok_or_else(|| {
            PayloadError::invalid_params(format!("{} must be an operator object", label))
        })?;
        if ops.is_empty() {
            return Err(PayloadError::invalid_params(format!(
                "{} must contain at least one operator",
                label
            )));
        }
        let mut parsed = Vec::with_capacity(ops.len());
        for (op, operand) in ops {
            let operator = op
                .parse::<Operator>()
                .map_err(|err| err.with_details(serde_json::json!({ "path": label })))?;
            parsed.push((operator, operand.clone()));
        }
        fields.insert(field.clone(), FieldCondition(parsed));
    }
    Ok(Where::Fields(fields))
}

fn parse_children(value: &Value, path: &str) -> Result<Vec<Where>, PayloadError> {
    let items = value
        .as_array()
        .ok_or_else(|| PayloadError::invalid_params(format!("{} must be an array", path)))?;
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| parse_node(item, &format!("{}[{}]", path, idx)))
        .collect()
}
