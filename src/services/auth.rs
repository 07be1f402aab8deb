use crate::constants::auth::TOKEN_TTL_MS;
use crate::errors::PayloadError;
use crate::services::credentials::{AuthMode, AuthScheme, CredentialBundle};
use crate::services::logger::Logger;
use crate::services::token_cache::TokenCache;
use crate::services::transport::{HttpRequest, Transport};
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A usable credential for one request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    scheme: AuthScheme,
    token: String,
}

impl Credential {
    pub fn new(scheme: AuthScheme, token: &str) -> Self {
        Self {
            scheme,
            token: token.to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn header_value(&self) -> String {
        self.scheme.header_value(&self.token)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("scheme", &self.scheme)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Resolves credentials per request and owns the login token cache.
#[derive(Clone)]
pub struct AuthManager {
    logger: Logger,
    transport: Arc<dyn Transport>,
    cache: TokenCache,
    ttl: Duration,
}

impl AuthManager {
    pub fn new(logger: Logger, transport: Arc<dyn Transport>, cache: TokenCache) -> Self {
        Self {
            logger: logger.child("auth"),
            transport,
            cache,
            ttl: Duration::from_millis(TOKEN_TTL_MS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub async fn resolve_credential(
        &self,
        bundle: &CredentialBundle,
    ) -> Result<Credential, PayloadError> {
        let (email, password) = match bundle.mode() {
            AuthMode::ApiKey { key } => return Ok(Credential::new(bundle.scheme().clone(), key)),
            AuthMode::Login { email, password } => (email, password),
        };
        let key = bundle
            .cache_key()
            .ok_or_else(|| PayloadError::internal("login bundle without cache key"))?;

        if let Some(token) = self.cache.get(&key) {
            self.logger.debug("token cache hit", None);
            return Ok(Credential::new(bundle.scheme().clone(), &token));
        }

        let token = self.login(bundle, email, password).await?;
        self.cache.insert(&key, &token, self.ttl);
        Ok(Credential::new(bundle.scheme().clone(), &token))
    }

    /// Attaches the authorization header for `bundle` to `request`.
    pub async fn authorize(
        &self,
        bundle: &CredentialBundle,
        request: &mut HttpRequest,
    ) -> Result<(), PayloadError> {
        let credential = self.resolve_credential(bundle).await?;
        request.set_header(AUTHORIZATION.as_str(), credential.header_value());
        Ok(())
    }

    async fn login(
        &self,
        bundle: &CredentialBundle,
        email: &str,
        password: &str,
    ) -> Result<String, PayloadError> {
        let path = bundle.api_path(&[bundle.user_collection(), "login"]);
        self.logger.info(
            "login",
            Some(&serde_json::json!({ "collection": bundle.user_collection(), "email": email })),
        );
        let request = HttpRequest::new(Method::POST, bundle.base_url(), &path)
            .with_body(serde_json::json!({ "email": email, "password": password }));

        let response = self.transport.send(&request).await.map_err(|err| {
            PayloadError::authentication(format!("Authentication failed: {}", err.message))
        })?;
        if !response.is_success() {
            let reason = response
                .error_summary()
                .unwrap_or_else(|| format!("status {}", response.status));
            self.logger.warn(
                "login rejected",
                Some(&serde_json::json!({ "status": response.status })),
            );
            return Err(
                PayloadError::authentication(format!("Authentication failed: {}", reason))
                    .with_status(response.status)
                    .with_hint(format!(
                        "Check the email/password and that '{}' is an auth-enabled collection.",
                        bundle.user_collection()
                    )),
            );
        }

        response
            .body
            .get("token")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                PayloadError::authentication(
                    "Authentication failed: no token received from login response",
                )
            })
    }
}
