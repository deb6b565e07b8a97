//! Definition sources.
//!
//! Two interchangeable origins of entity/property definitions sit behind
//! one [`SchemaSource`] trait so the pipeline logic never forks per source:
//! the tabular CSV adapter (untrusted, validated) and the SQLite store
//! adapter (trusted, performs no re-validation).

pub mod rows;
pub mod store;
pub mod tabular;

pub use rows::{EntityRecord, PropertyRecord, SchemaRows};
pub use store::StoreSource;
pub use tabular::{ENTITY_COLUMNS, PROPERTY_COLUMNS, TabularSource, write_tabular};

use crate::error::Result;

/// One origin of schema definitions.
pub trait SchemaSource {
    /// Parse the source into the normalized record set.
    fn load(&self) -> Result<SchemaRows>;

    /// Whether the orchestrator must run semantic validation on the loaded
    /// records. Trusted stores return false: their write-time constraints
    /// already guarantee the schema invariants.
    fn requires_validation(&self) -> bool {
        true
    }

    /// Persist generation status for one entity after a successful run.
    /// Read-only sources ignore this.
    fn record_generation(&self, _entity: &str, _log: &str) -> Result<()> {
        Ok(())
    }

    /// Human-readable description used in logs.
    fn describe(&self) -> String;
}
