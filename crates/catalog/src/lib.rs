//! # Catalog Crate
//!
//! This crate owns the read-only policy reference table used to enrich
//! recommendations with static per-policy metadata.
//!
//! ## Main Components
//!
//! - **types**: `PolicyRecord` (one CSV row) and `PolicyMetadata` (fully
//!   resolved tuple with per-column defaults)
//! - **table**: `PolicyCatalog` loading and the three-step name lookup
//! - **error**: Error types for catalog loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::PolicyCatalog;
//! use std::path::Path;
//!
//! let catalog = PolicyCatalog::load_from_csv(Path::new("data/policies.csv"))?;
//!
//! // Lookup never fails: unknown names resolve to the default tuple
//! let metadata = catalog.lookup("Guardian Shield Term Plan");
//! println!("{} -> {}", metadata.policy_type, metadata.transparency_score);
//! ```

// Public modules
pub mod error;
pub mod table;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{CatalogError, Result};
pub use table::PolicyCatalog;
pub use types::{
    PolicyMetadata, PolicyRecord, DEFAULT_COMPLIANCE_SCORE, DEFAULT_FINANCIAL_SAFETY_SCORE,
    DEFAULT_POLICY_TYPE, DEFAULT_SUITABILITY_SCORE, DEFAULT_TRANSPARENCY_SCORE,
};
