//! HTTP handlers for the palm reading service.

pub mod analysis;
pub mod health;
pub mod metrics;

pub use analysis::{analyze_palm, get_analysis};
pub use health::{health_check, readiness_check};
pub use metrics::metrics;
