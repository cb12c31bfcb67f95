// src/config/server.rs
// Server, database, and rate-limit bucket configuration

use serde::{Deserialize, Serialize};

/// HTTP adapter bind address (the adapter itself is a thin illustrative layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: super::helpers::env_or("WORKBENCH_HOST", "0.0.0.0"),
            port: super::helpers::env_parsed("WORKBENCH_PORT", 8080),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: super::helpers::env_or("DATABASE_URL", "sqlite://workbench.db"),
            max_connections: super::helpers::env_parsed("WORKBENCH_SQLITE_MAX_CONNECTIONS", 10),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            filter: super::helpers::env_or("RUST_LOG", "info"),
        }
    }
}

/// One named fixed-window bucket definition (§4.7). `limit=0` bypasses the bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BucketConfig {
    pub limit: u32,
    pub window_secs: u64,
}

/// Named per-operation rate buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub interpret: BucketConfig,
    pub generate: BucketConfig,
    pub save: BucketConfig,
    pub publish: BucketConfig,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        Self {
            interpret: BucketConfig {
                limit: super::helpers::env_parsed("WORKBENCH_INTERPRET_LIMIT", 8),
                window_secs: super::helpers::env_parsed("WORKBENCH_INTERPRET_WINDOW", 60),
            },
            generate: BucketConfig {
                limit: super::helpers::env_parsed("WORKBENCH_GENERATE_LIMIT", 5),
                window_secs: super::helpers::env_parsed("WORKBENCH_GENERATE_WINDOW", 60),
            },
            save: BucketConfig {
                limit: super::helpers::env_parsed("WORKBENCH_SAVE_LIMIT", 20),
                window_secs: super::helpers::env_parsed("WORKBENCH_SAVE_WINDOW", 60),
            },
            publish: BucketConfig {
                limit: super::helpers::env_parsed("WORKBENCH_PUBLISH_LIMIT", 6),
                window_secs: super::helpers::env_parsed("WORKBENCH_PUBLISH_WINDOW", 600),
            },
        }
    }
}
