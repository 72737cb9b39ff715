//! HTTP request handlers.

pub mod generate;
pub mod health;
pub mod metrics;

pub use generate::{GenerateRequest, generate_file};
pub use health::{HealthReport, health_check};
pub use metrics::metrics;
