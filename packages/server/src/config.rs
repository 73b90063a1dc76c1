use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the blob store.
    pub root: String,
    /// Hard cap on a single uploaded payload, in bytes.
    pub max_blob_size: u64,
    /// Per-user storage quota, in bytes. Dedup-aware: each distinct blob a
    /// user holds is charged once.
    pub quota_bytes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Requests per second allowed per user; 0 disables throttling.
    pub per_second: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.root", "./data/blobs")?
            .set_default("storage.max_blob_size", 128 * 1024 * 1024)?
            .set_default("storage.quota_bytes", 10 * 1024 * 1024)?
            .set_default("rate_limit.per_second", 2)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., VAULT__STORAGE__QUOTA_BYTES)
            .add_source(Environment::with_prefix("VAULT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
