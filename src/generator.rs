//! Generator orchestrator: one run of the pipeline.
//!
//! Sequence: load records from the source, validate (unless the source is
//! trusted), build the immutable definition set, snapshot every candidate
//! path, then drive the enabled emitter stages per entity in fixed order.
//! Any stage failure triggers a best-effort restore of the snapshot; a
//! failed restore escalates to the most severe outcome.

use crate::config::GeneratorConfig;
use crate::emit::{Artifact, EmitContext, EmitterStage, StageKind, all_stages};
use crate::error::Result;
use crate::schema::{EntityDefinition, SchemaSet, validate};
use crate::snapshot::{Snapshot, SnapshotManager};
use crate::source::SchemaSource;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use strum::Display;
use tempfile::NamedTempFile;

/// Terminal outcome taxonomy of one run.
///
/// `ValidationFailed` and `NoEntitiesToGenerate` are pre-flight and side-
/// effect free. `EmitterFailed` means the snapshot was restored and the run
/// is safe to retry. `RollbackFailed` means the target tree is inconsistent
/// and requires manual recovery from the backup folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcome {
    Success,
    ValidationFailed,
    NoEntitiesToGenerate,
    EmitterFailed,
    RollbackFailed,
}

/// Terminal output of one orchestrator run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub outcome: RunOutcome,
    pub success: bool,
    pub generated_files: Vec<PathBuf>,
    pub backup: Option<String>,
    pub errors: Vec<String>,
    pub entity_count: usize,
}

impl GenerationResult {
    fn pre_flight(outcome: RunOutcome, errors: Vec<String>) -> Self {
        Self {
            outcome,
            success: false,
            generated_files: Vec::new(),
            backup: None,
            errors,
            entity_count: 0,
        }
    }
}

/// Drives one generation run over a single definition source.
pub struct Generator {
    config: GeneratorConfig,
    source: Box<dyn SchemaSource>,
    snapshots: SnapshotManager,
    stages: Vec<Box<dyn EmitterStage>>,
}

impl Generator {
    pub fn new(config: GeneratorConfig, source: Box<dyn SchemaSource>) -> Self {
        Self::with_stages(config, source, all_stages())
    }

    /// Construct with an explicit stage list. The standard list comes from
    /// [`all_stages`]; tests inject failing stages through this seam.
    pub fn with_stages(
        config: GeneratorConfig,
        source: Box<dyn SchemaSource>,
        stages: Vec<Box<dyn EmitterStage>>,
    ) -> Self {
        let snapshots = SnapshotManager::new(&config.backup_root);
        Self {
            config,
            source,
            snapshots,
            stages,
        }
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    /// Run the pipeline, optionally filtered to one named entity,
    /// optionally without any filesystem mutation.
    pub fn generate(
        &self,
        entity_filter: Option<&str>,
        dry_run: bool,
    ) -> Result<GenerationResult> {
        tracing::info!(
            source = %self.source.describe(),
            filter = entity_filter.unwrap_or("<all>"),
            dry_run,
            "generation run started"
        );

        let rows = self.source.load()?;

        // Validation always runs over the unfiltered set so cross-entity
        // relation targets resolve even when a name filter is applied.
        if self.source.requires_validation() || self.config.validate_trusted {
            let report = validate(&rows);
            if !report.is_valid() {
                tracing::warn!(errors = report.errors.len(), "validation failed");
                return Ok(GenerationResult::pre_flight(
                    RunOutcome::ValidationFailed,
                    report.errors,
                ));
            }
        }

        let schema = SchemaSet::from_rows(&rows)?;
        let targets: Vec<&EntityDefinition> = match entity_filter {
            Some(name) => schema.get(name).into_iter().collect(),
            None => schema.entities.iter().collect(),
        };
        if targets.is_empty() {
            tracing::info!("nothing to generate");
            return Ok(GenerationResult::pre_flight(
                RunOutcome::NoEntitiesToGenerate,
                Vec::new(),
            ));
        }

        let cx = EmitContext::new(&schema, &self.config.output_root);

        // The transaction boundary: one snapshot of every path any enabled
        // stage might touch, taken before the first emitter runs.
        let snapshot = if dry_run {
            None
        } else {
            let mut candidates = Vec::new();
            for entity in &targets {
                for stage in self.stages_for(entity) {
                    candidates.extend(stage.plan(entity, &cx));
                }
            }
            Some(self.snapshots.create_backup(&candidates, "pre-generate")?)
        };

        let mut generated: Vec<PathBuf> = Vec::new();
        for entity in &targets {
            let entity_start = generated.len();
            for stage in self.stages_for(entity) {
                let emitted = self.run_stage(stage.as_ref(), entity, &cx, dry_run);
                match emitted {
                    Ok(mut paths) => generated.append(&mut paths),
                    Err(err) => {
                        return Ok(self.fail(
                            entity,
                            stage.kind(),
                            &err,
                            snapshot.as_ref(),
                            generated,
                            targets.len(),
                        ));
                    }
                }
            }
            if !dry_run {
                let log = format!(
                    "generated {} artifacts",
                    generated.len() - entity_start
                );
                if let Err(err) = self.source.record_generation(&entity.name, &log) {
                    tracing::warn!(entity = %entity.name, %err, "could not record generation status");
                }
            }
        }

        tracing::info!(
            entities = targets.len(),
            files = generated.len(),
            "generation run finished"
        );
        Ok(GenerationResult {
            outcome: RunOutcome::Success,
            success: true,
            generated_files: generated,
            backup: snapshot.map(|s| s.id),
            errors: Vec::new(),
            entity_count: targets.len(),
        })
    }

    /// Stages enabled for this run and this entity: the configuration
    /// toggle applies to every stage, the entity's `generate_tests` flag
    /// additionally gates the four test stages.
    fn stages_for<'s>(
        &'s self,
        entity: &EntityDefinition,
    ) -> impl Iterator<Item = &'s Box<dyn EmitterStage>> {
        let generate_tests = entity.generate_tests;
        self.stages.iter().filter(move |stage| {
            let kind = stage.kind();
            self.config.is_stage_enabled(kind) && (!kind.is_test() || generate_tests)
        })
    }

    fn run_stage(
        &self,
        stage: &dyn EmitterStage,
        entity: &EntityDefinition,
        cx: &EmitContext<'_>,
        dry_run: bool,
    ) -> Result<Vec<PathBuf>> {
        let span = tracing::debug_span!("stage", entity = %entity.name, stage = %stage.kind());
        let _guard = span.enter();

        let artifacts = stage.emit(entity, cx)?;
        let mut paths = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            if !dry_run {
                write_artifact(&artifact)?;
            }
            paths.push(artifact.path);
        }
        tracing::debug!(files = paths.len(), "stage complete");
        Ok(paths)
    }

    fn fail(
        &self,
        entity: &EntityDefinition,
        stage: StageKind,
        err: &crate::error::GeneratorError,
        snapshot: Option<&Snapshot>,
        generated: Vec<PathBuf>,
        entity_count: usize,
    ) -> GenerationResult {
        tracing::error!(entity = %entity.name, stage = %stage, %err, "emitter stage failed");
        let mut errors = vec![format!("{}/{}: {}", entity.name, stage, err)];
        let mut outcome = RunOutcome::EmitterFailed;

        if let Some(snapshot) = snapshot {
            match self.snapshots.restore_backup(snapshot) {
                Ok(()) => {
                    tracing::info!(snapshot = %snapshot.id, "rolled back to pre-run state");
                }
                Err(restore_err) => {
                    outcome = RunOutcome::RollbackFailed;
                    errors.push(format!(
                        "rollback from snapshot `{}` failed: {restore_err}; manual recovery required",
                        snapshot.id
                    ));
                    tracing::error!(
                        snapshot = %snapshot.id,
                        %restore_err,
                        "rollback failed; manual recovery required"
                    );
                }
            }
        }

        GenerationResult {
            outcome,
            success: false,
            generated_files: generated,
            backup: snapshot.map(|s| s.id.clone()),
            errors,
            entity_count,
        }
    }
}

/// Atomic write: temp file in the target directory, then rename over the
/// destination.
fn write_artifact(artifact: &Artifact) -> Result<()> {
    let parent = artifact
        .path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent)?;

    let mut temp = NamedTempFile::new_in(&parent)?;
    temp.write_all(artifact.contents.as_bytes())?;
    temp.flush()?;
    temp.persist(&artifact.path).map_err(|e| e.error)?;
    Ok(())
}
