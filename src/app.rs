use crate::errors::PayloadError;
use crate::managers::executor::Executor;
use crate::managers::options::OptionLoader;
use crate::services::auth::AuthManager;
use crate::services::discovery::DiscoveryClient;
use crate::services::logger::Logger;
use crate::services::token_cache::TokenCache;
use crate::services::transport::{ReqwestTransport, Transport};
use std::sync::Arc;

/// Everything one host process needs, sharing a single token cache.
pub struct App {
    pub logger: Logger,
    pub auth: AuthManager,
    pub discovery: DiscoveryClient,
    pub options: OptionLoader,
    pub executor: Executor,
}

impl App {
    pub fn initialize() -> Result<Self, PayloadError> {
        let logger = Logger::new("payload");
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(logger.clone())?);
        Ok(Self::with_transport(logger, transport))
    }

    pub fn with_transport(logger: Logger, transport: Arc<dyn Transport>) -> Self {
        let auth = AuthManager::new(logger.clone(), transport.clone(), TokenCache::new());
        let discovery = DiscoveryClient::new(logger.clone(), transport.clone(), auth.clone());
        let options = OptionLoader::new(logger.clone(), discovery.clone());
        let executor = Executor::new(logger.clone(), transport, auth.clone());

        Self {
            logger,
            auth,
            discovery,
            options,
            executor,
        }
    }

    /// Drops cached session tokens. Call when the host tears the client down.
    pub fn shutdown(&self) {
        let cached = self.auth.cache().len();
        self.auth.cache().clear();
        self.logger.debug(
            "shutdown",
            Some(&serde_json::json!({ "cached_tokens": cached, "log": self.logger.stats() })),
        );
    }
}
