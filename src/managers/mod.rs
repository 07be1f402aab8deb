pub mod executor;
pub mod options;
pub mod request_builder;
