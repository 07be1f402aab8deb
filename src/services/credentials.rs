use crate::constants::{api, auth, env, protocols::ALLOWED_HTTP};
use crate::errors::PayloadError;
use crate::services::validation::Validation;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use url::Url;

/// How requests authenticate. Fixed when the bundle is built.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    ApiKey { key: String },
    Login { email: String, password: String },
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::ApiKey { .. } => f.write_str("ApiKey { key: \"[REDACTED]\" }"),
            AuthMode::Login { email, .. } => write!(
                f,
                "Login {{ email: {:?}, password: \"[REDACTED]\" }}",
                email
            ),
        }
    }
}

/// Authorization header scheme derived once from the auth mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    /// `<collection> API-Key <key>`
    ApiKey { collection: String },
    /// `Bearer <token>`
    Bearer,
}

impl AuthScheme {
    pub fn header_value(&self, token: &str) -> String {
        match self {
            AuthScheme::ApiKey { collection } => {
                format!("{} {} {}", collection, auth::API_KEY_SCHEME, token)
            }
            AuthScheme::Bearer => format!("{} {}", auth::BEARER_SCHEME, token),
        }
    }
}

/// Connection settings supplied by the host per invocation. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    base_url: String,
    api_prefix: String,
    discovery_endpoint: String,
    user_collection: String,
    mode: AuthMode,
    scheme: AuthScheme,
    discovery_fallback: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBundle {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    api_prefix: Option<String>,
    #[serde(default, alias = "discoveryEndpoint")]
    endpoint: Option<String>,
    #[serde(default)]
    user_collection: Option<String>,
    #[serde(default)]
    auth_method: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    discovery_fallback: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CredentialBundle {
    pub fn api_key(base_url: &str, user_collection: &str, key: &str) -> Result<Self, PayloadError> {
        Self::from_raw(RawBundle {
            base_url: Some(base_url.to_string()),
            user_collection: Some(user_collection.to_string()),
            api_key: Some(key.to_string()),
            ..RawBundle::default()
        })
    }

    pub fn login(
        base_url: &str,
        user_collection: &str,
        email: &str,
        password: &str,
    ) -> Result<Self, PayloadError> {
        Self::from_raw(RawBundle {
            base_url: Some(base_url.to_string()),
            user_collection: Some(user_collection.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            ..RawBundle::default()
        })
    }

    /// Parses the credential document the host stores (camelCase keys).
    pub fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let raw: RawBundle = serde_json::from_value(value.clone()).map_err(|err| {
            PayloadError::invalid_params(format!("Invalid credentials: {}", err))
        })?;
        Self::from_raw(raw)
    }

    pub fn from_env() -> Result<Self, PayloadError> {
        let var = |name: &str| std::env::var(name).ok();
        Self::from_raw(RawBundle {
            base_url: var(env::BASE_URL),
            api_prefix: var(env::API_PREFIX),
            endpoint: var(env::DISCOVERY_ENDPOINT),
            user_collection: var(env::USER_COLLECTION),
            auth_method: None,
            api_key: var(env::API_KEY),
            email: var(env::EMAIL),
            password: var(env::PASSWORD),
            discovery_fallback: var(env::DISCOVERY_FALLBACK)
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")),
        })
    }

    fn from_raw(raw: RawBundle) -> Result<Self, PayloadError> {
        let base_url = normalize_base_url(raw.base_url.as_deref())?;
        let api_prefix = normalize_path(raw.api_prefix.as_deref().unwrap_or(api::DEFAULT_PREFIX));
        let discovery_endpoint = normalize_path(
            raw.endpoint
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(api::DEFAULT_DISCOVERY_ENDPOINT),
        );
        let user_collection = match non_empty(raw.user_collection) {
            Some(slug) => Validation::new().ensure_slug(&slug, "userCollection")?,
            None => api::DEFAULT_USER_COLLECTION.to_string(),
        };

        let api_key = non_empty(raw.api_key);
        let email = non_empty(raw.email);
        let password = raw.password.filter(|v| !v.is_empty());
        let method = non_empty(raw.auth_method).map(|m| m.to_lowercase());

        let mode = match method.as_deref() {
            Some("apikey") | Some("api_key") => AuthMode::ApiKey {
                key: api_key.ok_or_else(|| {
                    PayloadError::invalid_params("apiKey is required for API key authentication")
                })?,
            },
            Some("login") | Some("credentials") | Some("password") => {
                login_mode(email, password)?
            }
            Some(other) => {
                return Err(PayloadError::invalid_params(format!(
                    "Unknown authMethod: {}",
                    other
                ))
                .with_hint("Use \"apiKey\" or \"login\"."))
            }
            None => match (api_key, email.is_some() || password.is_some()) {
                (Some(_), true) => {
                    return Err(PayloadError::invalid_params(
                        "Credentials configure both an API key and a login",
                    )
                    .with_hint("Keep exactly one: apiKey, or email + password."))
                }
                (Some(key), false) => AuthMode::ApiKey { key },
                (None, true) => login_mode(email, password)?,
                (None, false) => {
                    return Err(PayloadError::invalid_params(
                        "Credentials configure no authentication",
                    )
                    .with_hint("Provide apiKey, or email + password."))
                }
            },
        };

        let scheme = match &mode {
            AuthMode::ApiKey { .. } => AuthScheme::ApiKey {
                collection: user_collection.clone(),
            },
            AuthMode::Login { .. } => AuthScheme::Bearer,
        };

        Ok(Self {
            base_url,
            api_prefix,
            discovery_endpoint,
            user_collection,
            mode,
            scheme,
            discovery_fallback: raw.discovery_fallback.unwrap_or(false),
        })
    }

    pub fn with_discovery_fallback(mut self, enabled: bool) -> Self {
        self.discovery_fallback = enabled;
        self
    }

    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        self.api_prefix = normalize_path(prefix);
        self
    }

    pub fn with_discovery_endpoint(mut self, endpoint: &str) -> Self {
        self.discovery_endpoint = normalize_path(endpoint);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn discovery_endpoint(&self) -> &str {
        &self.discovery_endpoint
    }

    pub fn user_collection(&self) -> &str {
        &self.user_collection
    }

    pub fn mode(&self) -> &AuthMode {
        &self.mode
    }

    pub fn scheme(&self) -> &AuthScheme {
        &self.scheme
    }

    pub fn discovery_fallback(&self) -> bool {
        self.discovery_fallback
    }

    /// `<prefix>/<segment>/...`, with every segment percent-encoded.
    pub fn api_path(&self, segments: &[&str]) -> String {
        let mut path = self.api_prefix.clone();
        for segment in segments {
            path.push('/');
            path.push_str(&encode_segment(segment));
        }
        path
    }

    /// Token cache key for login mode: origin + identity + actor collection.
    pub fn cache_key(&self) -> Option<String> {
        match &self.mode {
            AuthMode::Login { email, .. } => Some(format!(
                "{}:{}:{}",
                self.base_url, email, self.user_collection
            )),
            AuthMode::ApiKey { .. } => None,
        }
    }
}

fn login_mode(email: Option<String>, password: Option<String>) -> Result<AuthMode, PayloadError> {
    match (email, password) {
        (Some(email), Some(password)) => Ok(AuthMode::Login { email, password }),
        _ => Err(PayloadError::invalid_params(
            "email and password are both required for login authentication",
        )),
    }
}

fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

pub fn normalize_base_url(raw: Option<&str>) -> Result<String, PayloadError> {
    let raw = raw.unwrap_or("").trim();
    if raw.is_empty() {
        return Err(PayloadError::invalid_params("baseUrl is required")
            .with_hint("Set baseUrl, e.g. \"https://cms.example.com\"."));
    }
    let mut url = Url::parse(raw).map_err(|_| {
        PayloadError::invalid_params("Invalid baseUrl")
            .with_hint("Expected a valid URL, e.g. \"https://cms.example.com\".")
            .with_details(serde_json::json!({ "baseUrl": raw }))
    })?;
    let scheme = format!("{}:", url.scheme());
    if !ALLOWED_HTTP.contains(&scheme.as_str()) {
        return Err(PayloadError::invalid_params(
            "Only http/https base URLs are supported",
        ));
    }
    url.set_fragment(None);
    url.set_query(None);
    let normalized = format!("{}{}", url.origin().ascii_serialization(), url.path());
    Ok(normalized.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::{AuthMode, AuthScheme, CredentialBundle};
    use crate::errors::ErrorKind;
    use serde_json::json;

    #[test]
    fn api_key_bundle_uses_collection_scoped_scheme() {
        let bundle = CredentialBundle::from_value(&json!({
            "baseUrl": "https://cms.example.com/",
            "apiKey": "secret",
            "userCollection": "editors"
        }))
        .unwrap();
        assert_eq!(bundle.base_url(), "https://cms.example.com");
        assert_eq!(bundle.api_prefix(), "/api");
        assert_eq!(bundle.discovery_endpoint(), "/api/permissions");
        assert_eq!(
            bundle.scheme(),
            &AuthScheme::ApiKey {
                collection: "editors".to_string()
            }
        );
        assert_eq!(
            bundle.scheme().header_value("secret"),
            "editors API-Key secret"
        );
        assert!(bundle.cache_key().is_none());
    }

    #[test]
    fn login_bundle_uses_bearer_and_cache_key() {
        let bundle = CredentialBundle::login("http://localhost:3000", "users", "a@b.c", "pw").unwrap();
        assert_eq!(bundle.scheme(), &AuthScheme::Bearer);
        assert_eq!(bundle.scheme().header_value("tok"), "Bearer tok");
        assert_eq!(
            bundle.cache_key().as_deref(),
            Some("http://localhost:3000:a@b.c:users")
        );
        assert!(matches!(bundle.mode(), AuthMode::Login { .. }));
    }

    #[test]
    fn exactly_one_mode_is_required() {
        let both = CredentialBundle::from_value(&json!({
            "baseUrl": "https://cms.example.com",
            "apiKey": "k",
            "email": "a@b.c",
            "password": "pw"
        }));
        assert!(both.is_err());

        let neither = CredentialBundle::from_value(&json!({"baseUrl": "https://cms.example.com"}));
        assert!(neither.is_err());

        let explicit = CredentialBundle::from_value(&json!({
            "baseUrl": "https://cms.example.com",
            "authMethod": "login",
            "apiKey": "ignored",
            "email": "a@b.c",
            "password": "pw"
        }))
        .unwrap();
        assert!(matches!(explicit.mode(), AuthMode::Login { .. }));
    }

    #[test]
    fn user_collection_must_be_a_slug() {
        for bad in ["a:b", "users/x", "two words"] {
            let err = CredentialBundle::login("https://cms.example.com", bad, "a@b.c", "pw")
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidParams, "{bad}");
            assert!(err.message.contains("userCollection"));
        }
        let bundle = CredentialBundle::from_value(&json!({
            "baseUrl": "https://cms.example.com",
            "userCollection": " admins ",
            "apiKey": "k"
        }))
        .unwrap();
        assert_eq!(bundle.user_collection(), "admins");
    }

    #[test]
    fn rejects_non_http_base_url() {
        assert!(CredentialBundle::api_key("ftp://cms.example.com", "users", "k").is_err());
        assert!(CredentialBundle::api_key("", "users", "k").is_err());
    }

    #[test]
    fn api_path_encodes_segments_and_honors_prefix() {
        let bundle = CredentialBundle::api_key("https://cms.example.com/base", "users", "k")
            .unwrap()
            .with_api_prefix("v2/");
        assert_eq!(bundle.base_url(), "https://cms.example.com/base");
        assert_eq!(bundle.api_path(&["posts", "a b/c"]), "/v2/posts/a%20b%2Fc");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let bundle = CredentialBundle::login("https://cms.example.com", "users", "a@b.c", "hunter2").unwrap();
        let rendered = format!("{:?}", bundle);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("a@b.c"));
    }
}
