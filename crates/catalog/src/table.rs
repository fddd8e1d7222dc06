//! Catalog loading and lookup.
//!
//! The catalog is loaded once at startup and shared read-only across every
//! request, so lookups borrow `&self` and there is no interior mutability.
//!
//! Name matching runs in three steps, from strictest to loosest:
//! 1. exact match, case-insensitive
//! 2. substring match (a record whose name contains the query)
//! 3. the default metadata tuple
//!
//! Step 3 means `lookup` can never fail: an unrecognized name degrades to
//! defaults instead of an error.

use crate::error::{CatalogError, Result};
use crate::types::{PolicyMetadata, PolicyRecord};
use std::path::Path;
use tracing::{debug, info};

/// Read-only reference table of policy metadata.
#[derive(Debug, Clone, Default)]
pub struct PolicyCatalog {
    records: Vec<PolicyRecord>,
}

impl PolicyCatalog {
    /// Build a catalog from already-parsed records (used by tests and by
    /// callers that source the table from somewhere other than a file).
    pub fn from_records(records: Vec<PolicyRecord>) -> Self {
        Self { records }
    }

    /// Load the reference table from a CSV file.
    ///
    /// Expected headers: `Policies`, `policy_type`, `transparency_score`,
    /// `suitability_score`, `financial_safety_score`, `compliance_score`,
    /// `Description`. Blank score cells are fine; they resolve to the
    /// per-column defaults at lookup time.
    pub fn load_from_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut records = Vec::new();
        for row in reader.deserialize() {
            let record: PolicyRecord = row?;
            records.push(record);
        }

        info!("Loaded {} policies from {}", records.len(), path.display());
        Ok(Self { records })
    }

    /// Number of policies in the table.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, in file order.
    pub fn records(&self) -> &[PolicyRecord] {
        &self.records
    }

    /// Resolve metadata for a policy name.
    ///
    /// Never fails: unknown names return [`PolicyMetadata::default`].
    pub fn lookup(&self, name: &str) -> PolicyMetadata {
        match self.find(name) {
            Some(record) => record.metadata(),
            None => {
                debug!("Policy '{}' not in catalog, using default metadata", name);
                PolicyMetadata::default()
            }
        }
    }

    /// Find the record backing a policy name, if any.
    ///
    /// Applies the exact-then-substring match but not the default step, so
    /// callers can distinguish a real row from a fallback.
    pub fn find(&self, name: &str) -> Option<&PolicyRecord> {
        let needle = name.to_lowercase();

        self.records
            .iter()
            .find(|r| r.name.to_lowercase() == needle)
            .or_else(|| {
                self.records
                    .iter()
                    .find(|r| r.name.to_lowercase().contains(&needle))
            })
    }

    /// Marketing description for a policy, when the table has one.
    pub fn description(&self, name: &str) -> Option<&str> {
        self.find(name)?.description.as_deref()
    }
}
