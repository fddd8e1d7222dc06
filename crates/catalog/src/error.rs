//! Error types for the catalog crate.
//!
//! Only catalog *loading* can fail. Once a catalog is built, every lookup
//! resolves to real metadata or the documented defaults, so there is no
//! lookup error variant.

use thiserror::Error;

/// Errors that can occur while loading the reference table
#[derive(Error, Debug)]
pub enum CatalogError {
    /// File could not be found or opened
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A row in the catalog file couldn't be parsed
    #[error("Malformed catalog row: {0}")]
    Csv(#[from] csv::Error),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogError>;
