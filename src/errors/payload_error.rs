use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Reflection endpoint unreachable, non-2xx, or malformed.
    Discovery,
    /// Login failed or returned no token.
    Authentication,
    /// Any non-success outcome of a regular item request.
    Request,
    InvalidParams,
    Internal,
}

#[derive(Debug, Clone, Serialize, Error)]
#[error("{message}")]
pub struct PayloadError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl PayloadError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            endpoint: None,
            status: None,
            hint: None,
            details: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Adds one key to `details`, turning a non-object value into `{ "value": ... }`.
    pub fn with_details_entry(mut self, key: &str, value: Value) -> Self {
        let mut map = match self.details.take() {
            Some(Value::Object(map)) => map,
            Some(other) => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                map
            }
            None => serde_json::Map::new(),
        };
        map.insert(key.to_string(), value);
        self.details = Some(Value::Object(map));
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Failure to load the schema graph. Always names the endpoint and how to fix it.
    pub fn discovery(endpoint: impl Into<String>, cause: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let message = format!(
            "Schema discovery failed at {}: {}",
            endpoint,
            cause.into()
        );
        Self::new(ErrorKind::Discovery, "DISCOVERY_FAILED", message)
            .with_hint(format!(
                "The server must expose GET {} returning {{ \"collections\": {{...}}, \"globals\": {{...}} }}. \
                 Check the discovery endpoint in the credentials and that the API user may read it.",
                endpoint
            ))
            .with_endpoint(endpoint)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, "AUTHENTICATION_FAILED", message)
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Request, "REQUEST_FAILED", message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, "INVALID_PARAMS", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, "INTERNAL", message)
    }

    /// Whether a batch running with continue-on-fail may turn this into an error record.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind, ErrorKind::Request | ErrorKind::InvalidParams)
    }
}

impl From<reqwest::Error> for PayloadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return PayloadError::request("HTTP request timed out");
        }
        PayloadError::request(format!("HTTP request failed: {}", err))
    }
}
