//! Schema model: closed type vocabularies, the immutable intermediate
//! representation, and the semantic validator.
//!
//! Flow: adapters produce normalized records (`crate::source::rows`), the
//! validator judges them, and [`SchemaSet::from_rows`] converts validated
//! records into typed, immutable definitions consumed by emitter stages.

pub mod entity;
pub mod property;
pub mod types;
pub mod validate;

pub use entity::{
    ApiConfig, EntityDefinition, GenerationStatus, MenuPlacement, PolicyConfig, SchemaSet,
};
pub use property::{
    ApiFieldConfig, FixtureHint, FormConfig, LocalizationConfig, PropertyDefinition, PropertyKind,
    RelationDescriptor, UiConfig,
};
pub use validate::{ValidationReport, validate};

use crate::error::{GeneratorError, Result};
use std::str::FromStr;

/// Parse a vocabulary token, tagging failures with the owning definition.
pub(crate) fn parse_vocab<T: FromStr>(
    field: &'static str,
    raw: &str,
    subject: &str,
) -> Result<T> {
    T::from_str(raw.trim()).map_err(|_| GeneratorError::UnknownVocabulary {
        field,
        value: raw.trim().to_string(),
        subject: subject.to_string(),
    })
}

/// Parse an optional numeric cell; empty means unset.
pub(crate) fn parse_opt_u32(
    field: &'static str,
    raw: &str,
    subject: &str,
) -> Result<Option<u32>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| GeneratorError::InvalidNumber {
            field,
            value: trimmed.to_string(),
            subject: subject.to_string(),
        })
}

/// Empty cells become `None`, everything else is kept verbatim.
pub(crate) fn none_if_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
