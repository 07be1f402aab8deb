use crate::constants::discovery::FALLBACK_AUTH_COLLECTIONS;
use crate::errors::PayloadError;
use crate::schema::{PayloadField, SchemaGraph};
use crate::services::credentials::CredentialBundle;
use crate::services::discovery::DiscoveryClient;
use crate::services::logger::Logger;
use crate::utils::flatten::{flatten_fields, flatten_permissions, FlatOption};
use crate::utils::suggest::unknown_name_error;

/// Dynamic option list a host can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    Collections,
    Globals,
    AuthCollections,
    CollectionFields(String),
    GlobalFields(String),
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Collections => "collections",
            OptionKind::Globals => "globals",
            OptionKind::AuthCollections => "auth-collections",
            OptionKind::CollectionFields(_) => "collection-fields",
            OptionKind::GlobalFields(_) => "global-fields",
        }
    }
}

pub fn collection_options(graph: &SchemaGraph) -> Vec<FlatOption> {
    graph.collections.keys().map(|slug| FlatOption::same(slug)).collect()
}

pub fn global_options(graph: &SchemaGraph) -> Vec<FlatOption> {
    graph.globals.keys().map(|slug| FlatOption::same(slug)).collect()
}

/// Auth-enabled collections, or the actor collection itself; common names when neither
/// is reported.
pub fn auth_collection_options(graph: &SchemaGraph, bundle: &CredentialBundle) -> Vec<FlatOption> {
    let found: Vec<FlatOption> = graph
        .collections
        .iter()
        .filter(|(slug, permission)| permission.auth || slug.as_str() == bundle.user_collection())
        .map(|(slug, _)| FlatOption::same(slug))
        .collect();
    if !found.is_empty() {
        return found;
    }
    FALLBACK_AUTH_COLLECTIONS
        .iter()
        .map(|slug| FlatOption::same(slug))
        .collect()
}

pub fn collection_field_options(
    graph: &SchemaGraph,
    collection: &str,
) -> Result<Vec<FlatOption>, PayloadError> {
    let permission = graph.collection(collection).ok_or_else(|| {
        let known: Vec<&str> = graph.collections.keys().map(String::as_str).collect();
        unknown_name_error("collection", collection, &known)
    })?;
    Ok(flatten_permissions(&permission.fields, ""))
}

pub fn global_field_options(
    graph: &SchemaGraph,
    global: &str,
) -> Result<Vec<FlatOption>, PayloadError> {
    let permission = graph.global(global).ok_or_else(|| {
        let known: Vec<&str> = graph.globals.keys().map(String::as_str).collect();
        unknown_name_error("global", global, &known)
    })?;
    Ok(flatten_permissions(&permission.fields, ""))
}

/// Options for a field schema supplied by the host, e.g. a collection config.
pub fn schema_field_options(fields: &[PayloadField]) -> Vec<FlatOption> {
    flatten_fields(fields, "")
}

pub fn options_for(
    graph: &SchemaGraph,
    bundle: &CredentialBundle,
    kind: &OptionKind,
) -> Result<Vec<FlatOption>, PayloadError> {
    match kind {
        OptionKind::Collections => Ok(collection_options(graph)),
        OptionKind::Globals => Ok(global_options(graph)),
        OptionKind::AuthCollections => Ok(auth_collection_options(graph, bundle)),
        OptionKind::CollectionFields(slug) => collection_field_options(graph, slug),
        OptionKind::GlobalFields(slug) => global_field_options(graph, slug),
    }
}

/// Discovers the schema and derives one option list from it. Every call re-fetches.
#[derive(Clone)]
pub struct OptionLoader {
    logger: Logger,
    discovery: DiscoveryClient,
}

impl OptionLoader {
    pub fn new(logger: Logger, discovery: DiscoveryClient) -> Self {
        Self {
            logger: logger.child("options"),
            discovery,
        }
    }

    pub async fn load(
        &self,
        bundle: &CredentialBundle,
        kind: &OptionKind,
    ) -> Result<Vec<FlatOption>, PayloadError> {
        let graph = self.discovery.discover_schema(bundle).await?;
        let options = options_for(&graph, bundle, kind)?;
        self.logger.debug(
            "options loaded",
            Some(&serde_json::json!({ "kind": kind.as_str(), "count": options.len() })),
        );
        Ok(options)
    }
}
