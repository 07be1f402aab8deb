use crate::constants::discovery::{PROBE_COLLECTIONS, PROBE_GLOBALS};
use crate::errors::{ErrorKind, PayloadError};
use crate::schema::{CollectionPermission, GlobalPermission, SchemaGraph};
use crate::services::auth::AuthManager;
use crate::services::credentials::CredentialBundle;
use crate::services::logger::Logger;
use crate::services::transport::{HttpRequest, Transport};
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

static DISCOVERY_SHAPE: Lazy<Option<JSONSchema>> = Lazy::new(|| {
    let schema = serde_json::json!({
        "type": "object",
        "required": ["collections", "globals"],
        "properties": {
            "collections": {
                "type": "object",
                "additionalProperties": { "type": "object" }
            },
            "globals": {
                "type": "object",
                "additionalProperties": { "type": "object" }
            }
        }
    });
    JSONSchema::compile(&schema).ok()
});

/// Loads the collection/global permission graph from the reflection endpoint.
///
/// Nothing is cached: every call hits the network.
#[derive(Clone)]
pub struct DiscoveryClient {
    logger: Logger,
    transport: Arc<dyn Transport>,
    auth: AuthManager,
}

impl DiscoveryClient {
    pub fn new(logger: Logger, transport: Arc<dyn Transport>, auth: AuthManager) -> Self {
        Self {
            logger: logger.child("discovery"),
            transport,
            auth,
        }
    }

    pub async fn discover_schema(
        &self,
        bundle: &CredentialBundle,
    ) -> Result<SchemaGraph, PayloadError> {
        match self.fetch_reflection(bundle).await {
            Ok(graph) => Ok(graph),
            Err(err) if err.kind == ErrorKind::Discovery && bundle.discovery_fallback() => {
                self.logger.warn(
                    "reflection endpoint failed; probing common names",
                    Some(&serde_json::json!({ "endpoint": bundle.discovery_endpoint(), "cause": err.message })),
                );
                self.probe_common_names(bundle).await
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_reflection(
        &self,
        bundle: &CredentialBundle,
    ) -> Result<SchemaGraph, PayloadError> {
        let endpoint = bundle.discovery_endpoint();
        let mut request = HttpRequest::new(Method::GET, bundle.base_url(), endpoint);
        self.auth.authorize(bundle, &mut request).await?;

        let response = self
            .transport
            .send(&request)
            .await
            .map_err(|err| PayloadError::discovery(endpoint, err.message))?;
        if !response.is_success() {
            let cause = match response.error_summary() {
                Some(summary) => format!("status {}: {}", response.status, summary),
                None => format!("status {}", response.status),
            };
            return Err(PayloadError::discovery(endpoint, cause).with_status(response.status));
        }

        let graph = parse_schema_graph(&response.body).map_err(|cause| {
            PayloadError::discovery(endpoint, cause)
                .with_details(serde_json::json!({ "body": response.body }))
        })?;
        self.logger.debug(
            "schema discovered",
            Some(&serde_json::json!({
                "collections": graph.collections.len(),
                "globals": graph.globals.len(),
            })),
        );
        Ok(graph)
    }

    /// Compatibility mode: guess well-known slugs one request at a time.
    async fn probe_common_names(
        &self,
        bundle: &CredentialBundle,
    ) -> Result<SchemaGraph, PayloadError> {
        let mut graph = SchemaGraph::default();

        for slug in PROBE_COLLECTIONS {
            let request = HttpRequest::new(Method::GET, bundle.base_url(), &bundle.api_path(&[*slug]))
                .with_query("limit", "1");
            if self.probe(bundle, request).await? {
                graph
                    .collections
                    .insert(slug.to_string(), CollectionPermission::readable(true));
            }
        }
        if graph.collections.is_empty() {
            return Err(PayloadError::discovery(
                bundle.discovery_endpoint(),
                "could not discover any collections by probing common names",
            ));
        }

        for slug in PROBE_GLOBALS {
            let path = bundle.api_path(&[crate::constants::api::GLOBALS_SEGMENT, *slug]);
            let request = HttpRequest::new(Method::GET, bundle.base_url(), &path);
            if self.probe(bundle, request).await? {
                graph
                    .globals
                    .insert(slug.to_string(), GlobalPermission::readable(true));
            }
        }
        Ok(graph)
    }

    async fn probe(
        &self,
        bundle: &CredentialBundle,
        mut request: HttpRequest,
    ) -> Result<bool, PayloadError> {
        self.auth.authorize(bundle, &mut request).await?;
        match self.transport.send(&request).await {
            Ok(response) => Ok(response.is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Validates the reflection body shape, then decodes it.
pub fn parse_schema_graph(body: &Value) -> Result<SchemaGraph, String> {
    if let Some(validator) = DISCOVERY_SHAPE.as_ref() {
        if let Err(errors) = validator.validate(body) {
            let messages: Vec<String> = errors
                .map(|e| {
                    let at = e.instance_path.to_string();
                    if at.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", at, e)
                    }
                })
                .collect();
            return Err(format!(
                "unexpected response shape ({})",
                messages.join("; ")
            ));
        }
    }
    serde_json::from_value(body.clone())
        .map_err(|err| format!("unexpected response shape ({})", err))
}

#[cfg(test)]
mod tests {
    use super::{parse_schema_graph, DiscoveryClient};
    use crate::errors::{ErrorKind, PayloadError};
    use crate::services::auth::AuthManager;
    use crate::services::credentials::CredentialBundle;
    use crate::services::logger::{LogLevel, Logger};
    use crate::services::testing::ScriptedTransport;
    use crate::services::token_cache::TokenCache;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn client(transport: Arc<ScriptedTransport>) -> DiscoveryClient {
        let logger = Logger::with_level("test", LogLevel::Error);
        let auth = AuthManager::new(logger.clone(), transport.clone(), TokenCache::new());
        DiscoveryClient::new(logger, transport, auth)
    }

    fn bundle() -> CredentialBundle {
        CredentialBundle::api_key("https://cms.example.com", "users", "k").unwrap()
    }

    #[tokio::test]
    async fn reflection_endpoint_is_called_with_credentials() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            Method::GET,
            "/api/permissions",
            200,
            json!({"collections": {"posts": {"fields": true, "read": true}}, "globals": {}}),
        ));
        let graph = client(transport.clone()).discover_schema(&bundle()).await.unwrap();
        assert!(graph.collection("posts").unwrap().can_read());

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].header("Authorization"), Some("users API-Key k"));
    }

    #[tokio::test]
    async fn every_call_refetches() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            Method::GET,
            "/api/permissions",
            200,
            json!({"collections": {}, "globals": {}}),
        ));
        let discovery = client(transport.clone());
        discovery.discover_schema(&bundle()).await.unwrap();
        discovery.discover_schema(&bundle()).await.unwrap();
        assert_eq!(transport.count(Method::GET, "/api/permissions"), 2);
    }

    #[tokio::test]
    async fn missing_endpoint_is_a_discovery_error_without_probing() {
        let transport = Arc::new(ScriptedTransport::new());
        let err = client(transport.clone()).discover_schema(&bundle()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Discovery);
        assert_eq!(err.status, Some(404));
        assert_eq!(err.endpoint.as_deref(), Some("/api/permissions"));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_a_discovery_error() {
        let transport = Arc::new(ScriptedTransport::new().fail(
            Method::GET,
            "/api/permissions",
            PayloadError::request("connection refused"),
        ));
        let err = client(transport).discover_schema(&bundle()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Discovery);
        assert!(err.message.contains("connection refused"));
    }

    #[tokio::test]
    async fn fallback_probes_only_when_enabled() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(Method::GET, "/api/posts", 200, json!({"docs": []}))
                .respond(Method::GET, "/api/globals/footer", 200, json!({})),
        );
        let bundle = bundle().with_discovery_fallback(true);
        let graph = client(transport.clone()).discover_schema(&bundle).await.unwrap();

        let collections: Vec<&str> = graph.collections.keys().map(String::as_str).collect();
        let globals: Vec<&str> = graph.globals.keys().map(String::as_str).collect();
        assert_eq!(collections, vec!["posts"]);
        assert_eq!(globals, vec!["footer"]);
        assert!(transport
            .calls()
            .iter()
            .filter(|c| c.path == "/api/posts")
            .all(|c| c.query_value("limit") == Some("1")));
    }

    #[tokio::test]
    async fn fallback_with_nothing_found_still_fails() {
        let transport = Arc::new(ScriptedTransport::new());
        let bundle = bundle().with_discovery_fallback(true);
        let err = client(transport).discover_schema(&bundle).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Discovery);
        assert!(err.message.contains("could not discover any collections"));
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        assert!(parse_schema_graph(&json!([])).is_err());
        assert!(parse_schema_graph(&json!({"collections": []})).is_err());
        assert!(parse_schema_graph(&json!({"collections": {}, "globals": {"nav": 3}})).is_err());
        assert!(parse_schema_graph(&json!({"collections": {}, "globals": {}})).is_ok());
    }
}
