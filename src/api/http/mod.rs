// backend/src/api/http/mod.rs

pub mod health;
pub mod workbench;

pub use health::{health_check, readiness_check, liveness_check};
pub use workbench::router as workbench_router;
