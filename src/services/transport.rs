use crate::constants::{api::USER_AGENT, limits::ERROR_BODY_PREVIEW};
use crate::errors::PayloadError;
use crate::services::logger::Logger;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, Method};
use serde_json::Value;

/// Fully specified outgoing request. Built by the request builder, completed with an
/// authorization header by the auth manager, dispatched by a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub base_url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: Method, base_url: &str, path: &str) -> Self {
        Self {
            method,
            base_url: base_url.to_string(),
            path: path.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Replaces any existing header of the same name (case-insensitive).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn path_and_query(&self) -> Result<String, PayloadError> {
        if self.query.is_empty() {
            return Ok(self.path.clone());
        }
        let encoded = serde_urlencoded::to_string(&self.query).map_err(|err| {
            PayloadError::internal(format!("Failed to encode query string: {}", err))
        })?;
        Ok(format!("{}?{}", self.path, encoded))
    }

    pub fn url(&self) -> Result<String, PayloadError> {
        Ok(format!("{}{}", self.base_url, self.path_and_query()?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body of a 2xx response; anything else becomes a request error whose message
    /// carries the server's body in full.
    pub fn into_json(self) -> Result<Value, PayloadError> {
        if self.is_success() {
            return Ok(self.body);
        }
        Err(PayloadError::request(format!(
            "Request failed with status {}: {}",
            self.status,
            body_text(&self.body)
        ))
        .with_status(self.status)
        .with_details(serde_json::json!({ "body": self.body })))
    }

    /// First `errors[].message` of a Payload error body, if any.
    pub fn error_summary(&self) -> Option<String> {
        let errors = self.body.get("errors").and_then(Value::as_array)?;
        let joined = errors
            .iter()
            .filter_map(|e| {
                e.get("message")
                    .and_then(Value::as_str)
                    .or_else(|| e.as_str())
                    .map(str::to_string)
            })
            .collect::<Vec<_>>()
            .join("; ");
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

fn body_text(body: &Value) -> String {
    match body {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Shortened body for log lines only.
fn body_preview(body: &Value) -> String {
    let text = body_text(body);
    if text.len() <= ERROR_BODY_PREVIEW {
        return text;
    }
    let mut end = ERROR_BODY_PREVIEW;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request once. Non-2xx statuses are returned, not raised.
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, PayloadError>;
}

/// reqwest-backed transport. No retries; timeouts are reqwest's defaults.
#[derive(Clone)]
pub struct ReqwestTransport {
    logger: Logger,
    client: Client,
}

impl ReqwestTransport {
    pub fn new(logger: Logger) -> Result<Self, PayloadError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| PayloadError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            logger: logger.child("http"),
            client,
        })
    }
}

fn to_header_map(headers: &[(String, String)]) -> Result<HeaderMap, PayloadError> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| PayloadError::invalid_params(format!("Invalid header name: {}", key)))?;
        let val = HeaderValue::from_str(value)
            .map_err(|_| PayloadError::invalid_params(format!("Invalid value for header {}", key)))?;
        map.insert(name, val);
    }
    Ok(map)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, PayloadError> {
        let url = request.url()?;
        self.logger.debug(
            "send",
            Some(&serde_json::json!({
                "method": request.method.as_str(),
                "path": request.path,
            })),
        );

        let mut headers = to_header_map(&request.headers)?;
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        let response = HttpResponse { status, body };
        if !response.is_success() {
            self.logger.debug(
                "non-success response",
                Some(&serde_json::json!({
                    "status": status,
                    "path": request.path,
                    "body": body_preview(&response.body),
                })),
            );
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::{body_preview, HttpRequest, HttpResponse};
    use crate::errors::ErrorKind;
    use reqwest::Method;
    use serde_json::json;

    #[test]
    fn path_and_query_keeps_insertion_order() {
        let request = HttpRequest::new(Method::GET, "https://cms.example.com", "/api/posts")
            .with_query("limit", "5")
            .with_query("where", r#"{"title":{"equals":"x"}}"#);
        assert_eq!(
            request.path_and_query().unwrap(),
            "/api/posts?limit=5&where=%7B%22title%22%3A%7B%22equals%22%3A%22x%22%7D%7D"
        );
        assert_eq!(request.query_value("limit"), Some("5"));
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut request = HttpRequest::new(Method::GET, "https://cms.example.com", "/api/posts");
        request.set_header("authorization", "old");
        request.set_header("Authorization", "new");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("AUTHORIZATION"), Some("new"));
    }

    #[test]
    fn non_success_passes_body_through() {
        let response = HttpResponse {
            status: 403,
            body: json!({"errors": [{"message": "You are not allowed to perform this action."}]}),
        };
        assert_eq!(
            response.error_summary().as_deref(),
            Some("You are not allowed to perform this action.")
        );
        let err = response.into_json().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Request);
        assert_eq!(err.status, Some(403));
        assert!(err.message.contains("You are not allowed to perform this action."));
    }

    #[test]
    fn long_error_bodies_are_not_truncated() {
        let detail = "x".repeat(5_000);
        let body = json!({"errors": [{"message": detail}]});
        let response = HttpResponse {
            status: 500,
            body: body.clone(),
        };
        let err = response.into_json().unwrap_err();
        assert!(err.message.contains(&detail));
        assert!(err.message.ends_with(&body.to_string()));
        assert!(body_preview(&body).len() < err.message.len());
    }
}
