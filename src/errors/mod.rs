mod payload_error;

pub use payload_error::{ErrorKind, PayloadError};
