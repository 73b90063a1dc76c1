use std::sync::Arc;

use vault_core::Vault;

use crate::config::AppConfig;
use crate::throttle::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<Vault>,
    pub throttle: Arc<RateLimiter>,
    pub config: AppConfig,
}
