use crate::errors::PayloadError;
use crate::services::transport::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::sync::Mutex;

struct Route {
    method: Method,
    path: String,
    response: Result<HttpResponse, PayloadError>,
}

/// In-memory transport answering by method + path and recording every call.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.push(method, path, Ok(HttpResponse { status, body }));
        self
    }

    pub(crate) fn fail(self, method: Method, path: &str, err: PayloadError) -> Self {
        self.push(method, path, Err(err));
        self
    }

    fn push(&self, method: Method, path: &str, response: Result<HttpResponse, PayloadError>) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(Route {
                method,
                path: path.to_string(),
                response,
            });
        }
    }

    pub(crate) fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub(crate) fn count(&self, method: Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, PayloadError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        let routes = self
            .routes
            .lock()
            .map_err(|_| PayloadError::internal("scripted transport poisoned"))?;
        routes
            .iter()
            .find(|r| r.method == request.method && r.path == request.path)
            .map(|r| r.response.clone())
            .unwrap_or_else(|| {
                Ok(HttpResponse {
                    status: 404,
                    body: serde_json::json!({"errors": [{"message": "The requested resource was not found."}]}),
                })
            })
    }
}
