//! Domain models for the palm reading service.

pub mod analysis;
pub mod user;

pub use analysis::{AnalysisRecord, AnalysisResult, NewAnalysis};
pub use user::{NewUser, User};
