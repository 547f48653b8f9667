// Application-wide constants

/// Header names used by the auth stage
pub mod headers {
    pub const AUTHORIZATION: &str = "authorization";
    pub const JWT_SECRET: &str = "x-jwt-secret";
    pub const JWT_ISSUER: &str = "x-jwt-issuer";
    pub const JWT_AUDIENCE: &str = "x-jwt-audience";
    pub const CLAIM_PREFIX: &str = "X-";
    pub const REQUEST_ID: &str = "x-request-id";
    pub const FORWARDED_FOR: &str = "x-forwarded-for";
}

/// Values sent by the CORS stage on every routed response
pub mod cors {
    pub const ALLOW_ORIGIN: &str = "*";
    pub const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
    pub const ALLOW_HEADERS: &str =
        "Accept, Authorization, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token";
    pub const ALLOW_CREDENTIALS: &str = "true";
    pub const EXPOSE_HEADERS: &str = "Content-Type";
}

/// Headers that only apply to a single connection and are never relayed
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Default configuration values
pub mod defaults {
    pub const CONFIG_PATH: &str = "./config/config.yaml";
    pub const PORT: u16 = 8080;
    pub const LISTEN_HOST: &str = "0.0.0.0";
    pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
}

/// Time conversion helpers
pub mod time {
    pub const SECONDS_PER_MINUTE: u64 = 60;
    pub const SECONDS_PER_HOUR: u64 = 3600;
}
