//! Server crate for the TrustRecs recommendation backend.
//!
//! This crate contains the orchestrator that coordinates ranking,
//! per-policy trust scoring, and aggregation into one caller-facing
//! response.

pub mod config;
pub mod error;
pub mod orchestrator;

pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result, ValidationError};
pub use orchestrator::RecommendationOrchestrator;
