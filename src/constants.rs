pub mod api {
    pub const DEFAULT_PREFIX: &str = "/api";
    pub const DEFAULT_DISCOVERY_ENDPOINT: &str = "/api/permissions";
    pub const DEFAULT_USER_COLLECTION: &str = "users";
    pub const GLOBALS_SEGMENT: &str = "globals";
    pub const USER_AGENT: &str = "payload-dynamic/0.3";
}

pub mod auth {
    pub const TOKEN_TTL_MS: u64 = 3_600_000;
    pub const API_KEY_SCHEME: &str = "API-Key";
    pub const BEARER_SCHEME: &str = "Bearer";
}

pub mod discovery {
    pub const PROBE_COLLECTIONS: &[&str] = &["users", "posts", "pages", "media", "categories", "tags"];
    pub const PROBE_GLOBALS: &[&str] = &["settings", "config", "navigation", "footer", "header"];
    pub const FALLBACK_AUTH_COLLECTIONS: &[&str] = &["users", "admins", "members"];
}

pub mod env {
    pub const BASE_URL: &str = "PAYLOAD_BASE_URL";
    pub const API_PREFIX: &str = "PAYLOAD_API_PREFIX";
    pub const DISCOVERY_ENDPOINT: &str = "PAYLOAD_DISCOVERY_ENDPOINT";
    pub const USER_COLLECTION: &str = "PAYLOAD_USER_COLLECTION";
    pub const API_KEY: &str = "PAYLOAD_API_KEY";
    pub const EMAIL: &str = "PAYLOAD_EMAIL";
    pub const PASSWORD: &str = "PAYLOAD_PASSWORD";
    pub const DISCOVERY_FALLBACK: &str = "PAYLOAD_DISCOVERY_FALLBACK";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}

pub mod limits {
    pub const MAX_SUGGESTIONS: usize = 3;
    pub const ERROR_BODY_PREVIEW: usize = 2_000;
}

pub mod protocols {
    pub const ALLOWED_HTTP: &[&str] = &["http:", "https:"];
}
