use crate::errors::PayloadError;
use crate::managers::request_builder::{ItemParams, RequestBuilder};
use crate::services::auth::AuthManager;
use crate::services::credentials::CredentialBundle;
use crate::services::logger::Logger;
use crate::services::transport::Transport;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairedItem {
    pub item: usize,
}

/// One output record: the response body (or `{"error": ...}`) and the input index it
/// came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemResult {
    pub json: Value,
    #[serde(rename = "pairedItem")]
    pub paired_item: PairedItem,
}

impl ItemResult {
    pub fn success(index: usize, body: Value) -> Self {
        Self {
            json: body,
            paired_item: PairedItem { item: index },
        }
    }

    pub fn failure(index: usize, err: &PayloadError) -> Self {
        Self {
            json: serde_json::json!({ "error": err.message }),
            paired_item: PairedItem { item: index },
        }
    }

    pub fn is_error(&self) -> bool {
        self.json.get("error").is_some() && self.json.as_object().map(|o| o.len()) == Some(1)
    }
}

/// Runs work items strictly in order, one request at a time.
#[derive(Clone)]
pub struct Executor {
    logger: Logger,
    transport: Arc<dyn Transport>,
    auth: AuthManager,
    builder: RequestBuilder,
}

impl Executor {
    pub fn new(logger: Logger, transport: Arc<dyn Transport>, auth: AuthManager) -> Self {
        Self {
            logger: logger.child("executor"),
            transport,
            auth,
            builder: RequestBuilder::new(),
        }
    }

    pub async fn execute(
        &self,
        bundle: &CredentialBundle,
        items: &[Value],
        continue_on_fail: bool,
    ) -> Result<Vec<ItemResult>, PayloadError> {
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match self.execute_item(bundle, index, item).await {
                Ok(body) => results.push(ItemResult::success(index, body)),
                Err(err) if continue_on_fail && err.is_recoverable() => {
                    self.logger.warn(
                        "item failed",
                        Some(&serde_json::json!({ "item": index, "code": err.code, "status": err.status })),
                    );
                    results.push(ItemResult::failure(index, &err));
                }
                Err(err) => {
                    self.logger.error(
                        "batch aborted",
                        Some(&serde_json::json!({ "item": index, "code": err.code })),
                    );
                    return Err(err.with_details_entry("item", Value::from(index)));
                }
            }
        }
        Ok(results)
    }

    async fn execute_item(
        &self,
        bundle: &CredentialBundle,
        index: usize,
        item: &Value,
    ) -> Result<Value, PayloadError> {
        let params = ItemParams::from_value(item)?;
        let mut request = self.builder.build(bundle, &params)?;
        if params.operation.is_bulk_delete() && params.options.where_clause.is_none() {
            self.logger.warn(
                "bulk delete without a where clause",
                Some(&serde_json::json!({ "item": index, "path": request.path })),
            );
        }
        self.auth.authorize(bundle, &mut request).await?;

        self.logger.debug(
            "execute",
            Some(&serde_json::json!({
                "item": index,
                "resource": params.operation.resource().as_str(),
                "operation": params.operation.as_str(),
            })),
        );
        let response = self.transport.send(&request).await?;
        response.into_json()
    }
}
