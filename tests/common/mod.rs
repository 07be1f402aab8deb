#![allow(dead_code)]

use once_cell::sync::Lazy;
use payload_dynamic::app::App;
use payload_dynamic::services::credentials::CredentialBundle;
use payload_dynamic::services::logger::{LogLevel, Logger};
use payload_dynamic::services::transport::{ReqwestTransport, Transport};
use std::sync::Arc;
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// App talking to a real HTTP server (wiremock) through reqwest.
pub fn app() -> App {
    let logger = Logger::with_level("test", LogLevel::Error);
    let transport: Arc<dyn Transport> =
        Arc::new(ReqwestTransport::new(logger.clone()).expect("transport"));
    App::with_transport(logger, transport)
}

pub fn api_key_bundle(base_url: &str) -> CredentialBundle {
    CredentialBundle::api_key(base_url, "users", "test-key").expect("api key bundle")
}

pub fn login_bundle(base_url: &str) -> CredentialBundle {
    CredentialBundle::login(base_url, "users", "ed@example.com", "pw").expect("login bundle")
}
