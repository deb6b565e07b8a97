//! entigen — a schema-driven scaffolding generator.
//!
//! Given a declarative description of application entities and their
//! properties (two CSV tables or a SQLite store), entigen validates the
//! description, converts it into an immutable intermediate representation,
//! and drives a fixed, dependency-ordered sequence of emitter stages that
//! each synthesize one category of source artifact. Every run is wrapped in
//! filesystem-level transactional semantics: a checksum-manifested snapshot
//! of every file the run might touch, restored automatically if any stage
//! fails.

pub mod config;
pub mod emit;
pub mod error;
pub mod generator;
pub mod logging;
pub mod schema;
pub mod snapshot;
pub mod source;

pub use config::{BackupsCommand, CliArgs, Command, GeneratorConfig, StoreCommand};
pub use emit::{Artifact, EmitContext, EmitterStage, STAGE_ORDER, StageKind};
pub use error::{GeneratorError, Result};
pub use generator::{GenerationResult, Generator, RunOutcome};
pub use logging::{LoggingConfig, init_logging};
pub use schema::{EntityDefinition, PropertyDefinition, SchemaSet, ValidationReport, validate};
pub use snapshot::{Snapshot, SnapshotManager};
pub use source::{SchemaSource, StoreSource, TabularSource, write_tabular};
