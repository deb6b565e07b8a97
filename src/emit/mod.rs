//! Emitter stages.
//!
//! Each stage is a pure function from one entity's definition (plus the
//! full entity set, for cross-reference resolution) to artifacts: path plus
//! byte payload. The orchestrator owns all filesystem writes, so stages can
//! be exercised in tests against hand-constructed definitions with no other
//! system state.
//!
//! Stage order is fixed and encodes semantic dependency only: generated
//! references in later artifacts assume the model type already exists, but
//! no stage ever reads another stage's emitted output.

pub mod api_resource;
pub mod context;
pub mod controller;
pub mod form;
pub mod model;
pub mod page;
pub mod policy;
pub mod repository;
pub mod test_suite;

pub use context::EmitContext;

use crate::error::Result;
use crate::schema::EntityDefinition;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};

/// The fixed stage vocabulary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    Model,
    ApiResource,
    Repository,
    Controller,
    Policy,
    Form,
    PageTemplate,
    ModelTest,
    ApiTest,
    RepositoryTest,
    ControllerTest,
}

impl StageKind {
    /// Test stages run last and are additionally gated by the entity's
    /// `generate_tests` flag.
    pub fn is_test(self) -> bool {
        matches!(
            self,
            Self::ModelTest | Self::ApiTest | Self::RepositoryTest | Self::ControllerTest
        )
    }
}

/// Execution order. The model comes first — every later stage's generated
/// references assume the model type exists — and the test stages come last,
/// asserting against all earlier artifacts.
pub const STAGE_ORDER: [StageKind; 11] = [
    StageKind::Model,
    StageKind::ApiResource,
    StageKind::Repository,
    StageKind::Controller,
    StageKind::Policy,
    StageKind::Form,
    StageKind::PageTemplate,
    StageKind::ModelTest,
    StageKind::ApiTest,
    StageKind::RepositoryTest,
    StageKind::ControllerTest,
];

/// One emitted artifact, not yet written to disk.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

/// One category of generated artifact.
pub trait EmitterStage {
    fn kind(&self) -> StageKind;

    /// Every path this stage would touch for `entity`. Used to build the
    /// snapshot candidate set before any emitter runs.
    fn plan(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Vec<PathBuf>;

    /// Produce the artifacts. Same definition, byte-identical output.
    fn emit(&self, entity: &EntityDefinition, cx: &EmitContext<'_>) -> Result<Vec<Artifact>>;
}

/// All stages, in execution order.
pub fn all_stages() -> Vec<Box<dyn EmitterStage>> {
    vec![
        Box::new(model::ModelStage),
        Box::new(api_resource::ApiResourceStage),
        Box::new(repository::RepositoryStage),
        Box::new(controller::ControllerStage),
        Box::new(policy::PolicyStage),
        Box::new(form::FormStage),
        Box::new(page::PageTemplateStage),
        Box::new(test_suite::ModelTestStage),
        Box::new(test_suite::ApiTestStage),
        Box::new(test_suite::RepositoryTestStage),
        Box::new(test_suite::ControllerTestStage),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_matches_registry() {
        let stages = all_stages();
        assert_eq!(stages.len(), STAGE_ORDER.len());
        for (stage, kind) in stages.iter().zip(STAGE_ORDER) {
            assert_eq!(stage.kind(), kind);
        }
    }

    #[test]
    fn model_runs_first_and_tests_run_last() {
        assert_eq!(STAGE_ORDER[0], StageKind::Model);
        assert!(STAGE_ORDER[7..].iter().all(|kind| kind.is_test()));
        assert!(STAGE_ORDER[..7].iter().all(|kind| !kind.is_test()));
    }

    #[test]
    fn stage_kind_round_trips_through_strings() {
        use std::str::FromStr;
        assert_eq!(StageKind::ApiResource.to_string(), "api-resource");
        assert_eq!(
            StageKind::from_str("page-template").unwrap(),
            StageKind::PageTemplate
        );
        assert!(StageKind::from_str("viewmodel").is_err());
    }
}
