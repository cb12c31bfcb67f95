// src/lib.rs

pub mod api;
pub mod config;
pub mod domain;
pub mod errors;
pub mod free_tier;
pub mod keyword_store;
pub mod llm;
pub mod moderation;
pub mod prompt_store;
pub mod rate_limit;
pub mod state;
pub mod workbench;
pub mod workspace;

pub use config::CONFIG;
pub use errors::{Result, WorkbenchError};
pub use state::AppState;
