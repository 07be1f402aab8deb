use crate::errors::PayloadError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

#[derive(Clone, Debug, Default)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_string(&self, value: &Value, label: &str) -> Result<String, PayloadError> {
        let text = match value {
            Value::String(text) => text.trim().to_string(),
            Value::Number(number) => number.to_string(),
            _ => String::new(),
        };
        if text.is_empty() {
            return Err(PayloadError::invalid_params(format!(
                "{} must be a non-empty string",
                label
            )));
        }
        Ok(text)
    }

    pub fn ensure_optional_string(
        &self,
        value: Option<&Value>,
        label: &str,
    ) -> Result<Option<String>, PayloadError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(val) => self.ensure_string(val, label).map(Some),
        }
    }

    /// Collection, global and block slugs end up as path segments.
    pub fn ensure_slug(&self, value: &str, label: &str) -> Result<String, PayloadError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PayloadError::invalid_params(format!(
                "{} must be a non-empty slug",
                label
            )));
        }
        if !SLUG_RE.is_match(trimmed) {
            return Err(PayloadError::invalid_params(format!(
                "{} '{}' is not a valid slug",
                label, trimmed
            ))
            .with_hint("Slugs may only contain letters, digits, '-' and '_'."));
        }
        Ok(trimmed.to_string())
    }

    pub fn ensure_optional_int(
        &self,
        value: Option<&Value>,
        label: &str,
    ) -> Result<Option<i64>, PayloadError> {
        let Some(value) = value else {
            return Ok(None);
        };
        match value {
            Value::Null => Ok(None),
            Value::String(text) if text.trim().is_empty() => Ok(None),
            Value::String(text) => text.trim().parse::<i64>().map(Some).map_err(|_| {
                PayloadError::invalid_params(format!("{} must be an integer", label))
            }),
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    return Ok(Some(int));
                }
                if number.is_u64() {
                    return Err(PayloadError::invalid_params(format!(
                        "{} is out of range",
                        label
                    )));
                }
                // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
                number
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| Some(f as i64))
                    .ok_or_else(|| {
                        PayloadError::invalid_params(format!(
                            "{} must be an integer within range",
                            label
                        ))
                    })
            }
            _ => Err(PayloadError::invalid_params(format!(
                "{} must be an integer",
                label
            ))),
        }
    }

    /// Accepts structured JSON or JSON text, the way host UIs hand over "json" parameters.
    pub fn ensure_json(&self, value: &Value, label: &str) -> Result<Value, PayloadError> {
        match value {
            Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(PayloadError::invalid_params(format!(
                        "{} must not be empty",
                        label
                    )));
                }
                serde_json::from_str(trimmed).map_err(|err| {
                    PayloadError::invalid_params(format!("{} must be valid JSON: {}", label, err))
                })
            }
            other => Ok(other.clone()),
        }
    }
}
