pub mod auth;
pub mod credentials;
pub mod discovery;
pub mod logger;
#[cfg(test)]
pub(crate) mod testing;
pub mod token_cache;
pub mod transport;
pub mod validation;
