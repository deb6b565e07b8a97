//! Error types for the generation pipeline.
//!
//! One `thiserror` enum covers the whole library surface; the binary edge
//! wraps it in `anyhow` for operator-facing context. Pre-flight problems
//! (broken headers, unknown vocabulary) surface here as typed variants,
//! while the run-level taxonomy (validation failed, emitter failed,
//! rollback failed) lives on [`crate::generator::RunOutcome`] because those
//! states are carried inside a `GenerationResult`, not raised as errors.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Errors raised by adapters, the snapshot manager and emitter stages.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// A tabular source header does not match the fixed column set.
    /// Always fatal for the whole source file.
    #[error("{table} table header mismatch: {detail}")]
    HeaderMismatch { table: &'static str, detail: String },

    /// A definition carried a token outside one of the closed vocabularies.
    /// Only reachable on the trusted store path or after a validator bug;
    /// the tabular path rejects these during validation.
    #[error("unknown {field} value `{value}` for {subject}")]
    UnknownVocabulary {
        field: &'static str,
        value: String,
        subject: String,
    },

    /// A numeric definition column did not parse.
    #[error("invalid {field} value `{value}` for {subject}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        subject: String,
    },

    /// Restore was requested but the backup folder has no manifest.
    #[error("backup manifest not found at {path:?}; manual recovery required")]
    ManifestMissing { path: PathBuf },

    /// A backup file no longer matches the checksum recorded at snapshot
    /// time. Restore refuses to copy suspect bytes back.
    #[error("backup file {path:?} failed checksum verification")]
    BackupChecksumMismatch { path: PathBuf },

    /// No backup folder exists for the requested snapshot id.
    #[error("snapshot `{id}` not found")]
    SnapshotNotFound { id: String },

    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("definition store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GeneratorError {
    /// True for errors that are cheap to retry after fixing the source
    /// definitions, false for anything that touched the filesystem.
    pub fn is_pre_flight(&self) -> bool {
        matches!(
            self,
            Self::HeaderMismatch { .. }
                | Self::UnknownVocabulary { .. }
                | Self::InvalidNumber { .. }
                | Self::Csv(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_mismatch_is_pre_flight() {
        let err = GeneratorError::HeaderMismatch {
            table: "entity",
            detail: "missing column `icon`".into(),
        };
        assert!(err.is_pre_flight());
        assert!(err.to_string().contains("entity table header mismatch"));
    }

    #[test]
    fn manifest_missing_is_not_pre_flight() {
        let err = GeneratorError::ManifestMissing {
            path: PathBuf::from("/tmp/backups/x/manifest.json"),
        };
        assert!(!err.is_pre_flight());
    }
}
