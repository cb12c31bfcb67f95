// src/config/mod.rs
// Central configuration for the prompt workbench, frozen at process startup.

pub mod helpers;
pub mod server;
pub mod workbench;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

lazy_static! {
    pub static ref CONFIG: WorkbenchConfig = WorkbenchConfig::from_env();
}

/// Main configuration structure - composes all domain configs. Loaded once at
/// startup and never re-read; components take it by shared reference so every
/// request in the process sees identical tunables (SPEC_FULL.md §9: "global
/// configuration as immutable startup snapshot").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbenchConfig {
    pub server: server::ServerConfig,
    pub database: server::DatabaseConfig,
    pub logging: server::LoggingConfig,
    pub rate_limit: server::RateLimitConfig,
    pub keywords: workbench::KeywordConfig,
    pub moderation: workbench::ModerationConfig,
    pub free_tier: workbench::FreeTierConfig,
    pub model_gateway: workbench::ModelGatewayConfig,
}

impl WorkbenchConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // don't panic if .env doesn't exist (production)

        Self {
            server: server::ServerConfig::from_env(),
            database: server::DatabaseConfig::from_env(),
            logging: server::LoggingConfig::from_env(),
            rate_limit: server::RateLimitConfig::from_env(),
            keywords: workbench::KeywordConfig::from_env(),
            moderation: workbench::ModerationConfig::from_env(),
            free_tier: workbench::FreeTierConfig::from_env(),
            model_gateway: workbench::ModelGatewayConfig::from_env(),
        }
    }

    pub fn bind_address(&self) -> String {
        self.server.bind_address()
    }
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
