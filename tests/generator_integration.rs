//! End-to-end orchestrator runs: filtering, dry-run, idempotence, stage
//! toggles, rollback on mid-run failure, and the trusted-store path.

use entigen::emit::model::ModelStage;
use entigen::emit::{Artifact, EmitContext, EmitterStage, StageKind};
use entigen::schema::{SchemaSet, validate};
use entigen::source::SchemaSource;
use entigen::source::rows::{EntityRecord, SchemaRows};
use entigen::source::store::StoreSource;
use entigen::source::tabular::TabularSource;
use entigen::{GeneratorConfig, Generator, RunOutcome};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures/valid")
        .join(name)
}

fn tabular_source() -> Box<dyn SchemaSource> {
    Box::new(TabularSource::new(
        fixture("entities.csv"),
        fixture("properties.csv"),
    ))
}

fn config_in(dir: &Path) -> GeneratorConfig {
    GeneratorConfig {
        output_root: dir.join("out"),
        backup_root: dir.join("backups"),
        ..Default::default()
    }
}

/// Checksum map of every file under `root`, keyed by relative path.
fn tree_checksums(root: &Path) -> BTreeMap<PathBuf, String> {
    let mut sums = BTreeMap::new();
    if !root.exists() {
        return sums;
    }
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                sums.insert(relative, entigen::snapshot::file_checksum(&path).unwrap());
            }
        }
    }
    sums
}

#[test]
fn full_run_generates_all_stages_for_all_entities() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Generator::new(config_in(dir.path()), tabular_source());

    let result = generator.generate(None, false).unwrap();
    assert_eq!(result.outcome, RunOutcome::Success);
    assert!(result.success);
    assert_eq!(result.entity_count, 3);
    assert!(result.backup.is_some());
    assert!(result.errors.is_empty());

    let out = dir.path().join("out");
    for path in [
        "src/models/contact.rs",
        "src/models/organization.rs",
        "src/models/tag.rs",
        "src/api/contact_resource.rs",
        "src/repositories/contact_repository.rs",
        "src/controllers/contact_controller.rs",
        "src/policies/contact_policy.rs",
        "src/forms/contact_form.rs",
        "templates/contact/index.html",
        "templates/contact/detail.html",
        // Only Contact opts into test generation in the fixture.
        "tests/contact_model_test.rs",
        "tests/contact_api_test.rs",
        "tests/contact_repository_test.rs",
        "tests/contact_controller_test.rs",
    ] {
        assert!(out.join(path).is_file(), "missing {path}");
    }
    assert!(!out.join("tests/organization_model_test.rs").exists());
    assert!(!out.join("tests/tag_model_test.rs").exists());
}

#[test]
fn entity_filter_generates_only_that_entity() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Generator::new(config_in(dir.path()), tabular_source());

    let result = generator.generate(Some("Contact"), false).unwrap();
    assert_eq!(result.outcome, RunOutcome::Success);
    assert_eq!(result.entity_count, 1);
    assert!(!result.generated_files.is_empty());
    for path in &result.generated_files {
        let text = path.to_string_lossy();
        assert!(!text.contains("organization"), "unexpected path {text}");
        assert!(!text.contains("/tag"), "unexpected path {text}");
    }
}

#[test]
fn unknown_filter_is_a_clean_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Generator::new(config_in(dir.path()), tabular_source());

    let result = generator.generate(Some("Nonexistent"), false).unwrap();
    assert_eq!(result.outcome, RunOutcome::NoEntitiesToGenerate);
    assert!(!result.success);
    assert!(result.backup.is_none());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn dry_run_plans_without_touching_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Generator::new(config_in(dir.path()), tabular_source());

    let result = generator.generate(None, true).unwrap();
    assert_eq!(result.outcome, RunOutcome::Success);
    assert!(result.success);
    assert!(result.backup.is_none());
    assert!(!result.generated_files.is_empty());

    // Neither output tree nor backup tree came into being.
    assert!(!dir.path().join("out").exists());
    assert!(!dir.path().join("backups").exists());
}

#[test]
fn two_runs_produce_byte_identical_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Generator::new(config_in(dir.path()), tabular_source());

    generator.generate(None, false).unwrap();
    let first = tree_checksums(&dir.path().join("out"));
    assert!(!first.is_empty());

    generator.generate(None, false).unwrap();
    let second = tree_checksums(&dir.path().join("out"));
    assert_eq!(first, second);
}

#[test]
fn stage_toggles_limit_what_is_generated() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.enabled_stages = Some([StageKind::Model].into_iter().collect());
    let generator = Generator::new(config, tabular_source());

    let result = generator.generate(None, false).unwrap();
    assert_eq!(result.outcome, RunOutcome::Success);

    let out = dir.path().join("out");
    assert!(out.join("src/models/contact.rs").is_file());
    assert!(!out.join("src/repositories").exists());
    assert!(!out.join("src/controllers").exists());
    assert!(!out.join("tests").exists());
}

#[test]
fn validation_failure_stops_before_any_side_effect() {
    let dir = tempfile::tempdir().unwrap();
    let entities = dir.path().join("entities.csv");
    let properties = dir.path().join("properties.csv");

    // Contact's relation target is absent from the set.
    let original_entities = fs::read_to_string(fixture("entities.csv")).unwrap();
    let without_org: Vec<&str> = original_entities
        .lines()
        .filter(|line| !line.starts_with("Organization,"))
        .collect();
    fs::write(&entities, without_org.join("\n")).unwrap();
    fs::copy(fixture("properties.csv"), &properties).unwrap();

    let generator = Generator::new(
        config_in(dir.path()),
        Box::new(TabularSource::new(&entities, &properties)),
    );
    let result = generator.generate(None, false).unwrap();

    assert_eq!(result.outcome, RunOutcome::ValidationFailed);
    assert!(!result.success);
    assert!(result.backup.is_none());
    assert!(result.errors.iter().any(|e| e.contains("Contact.organization")));
    assert!(!dir.path().join("out").exists());
    assert!(!dir.path().join("backups").exists());
}

// ============================================================================
// Rollback
// ============================================================================

/// Stands in for the data-access stage and always fails.
struct FailingRepositoryStage;

impl EmitterStage for FailingRepositoryStage {
    fn kind(&self) -> StageKind {
        StageKind::Repository
    }

    fn plan(&self, entity: &entigen::EntityDefinition, cx: &EmitContext<'_>) -> Vec<PathBuf> {
        vec![cx.path(format!(
            "src/repositories/{}_repository.rs",
            entity.snake_name()
        ))]
    }

    fn emit(
        &self,
        _entity: &entigen::EntityDefinition,
        _cx: &EmitContext<'_>,
    ) -> entigen::Result<Vec<Artifact>> {
        Err(std::io::Error::other("simulated repository emitter failure").into())
    }
}

#[test]
fn mid_run_failure_rolls_back_to_pre_run_state() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    // Pre-existing artifact from an earlier run, with sentinel content.
    let model_path = out.join("src/models/contact.rs");
    fs::create_dir_all(model_path.parent().unwrap()).unwrap();
    fs::write(&model_path, "// sentinel: pre-run contents\n").unwrap();

    let pre = tree_checksums(&out);

    let generator = Generator::with_stages(
        config_in(dir.path()),
        tabular_source(),
        vec![Box::new(ModelStage), Box::new(FailingRepositoryStage)],
    );
    let result = generator.generate(Some("Contact"), false).unwrap();

    assert_eq!(result.outcome, RunOutcome::EmitterFailed);
    assert!(!result.success);
    assert!(result.backup.is_some());
    assert!(result.errors[0].contains("Contact"));
    assert!(result.errors[0].contains("repository"));
    // The model stage did produce its artifact before the failure.
    assert!(result
        .generated_files
        .iter()
        .any(|p| p.ends_with("src/models/contact.rs")));

    // Post-run checksums equal pre-run checksums exactly.
    let post = tree_checksums(&out);
    assert_eq!(pre, post);
    assert_eq!(
        fs::read_to_string(&model_path).unwrap(),
        "// sentinel: pre-run contents\n"
    );
}

#[test]
fn rollback_removes_artifacts_that_did_not_exist_before() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let generator = Generator::with_stages(
        config_in(dir.path()),
        tabular_source(),
        vec![Box::new(ModelStage), Box::new(FailingRepositoryStage)],
    );
    let result = generator.generate(Some("Contact"), false).unwrap();

    assert_eq!(result.outcome, RunOutcome::EmitterFailed);
    // The model artifact was written mid-run, then reverted away.
    assert!(!out.join("src/models/contact.rs").exists());
    assert_eq!(tree_checksums(&out).len(), 0);
}

// ============================================================================
// Trusted store path
// ============================================================================

/// A definition set that parses but would fail validation (bad icon).
fn invalid_but_loadable_schema() -> SchemaSet {
    let mut rows = SchemaRows::default();
    rows.entities.push(EntityRecord {
        name: "Widget".into(),
        label: "Widget".into(),
        plural_label: "Widgets".into(),
        icon: "NotKebab".into(),
        api_operations: vec!["list".into()],
        ..Default::default()
    });
    assert!(!validate(&rows).is_valid());
    SchemaSet::from_rows(&rows).unwrap()
}

#[test]
fn store_source_skips_validation_by_design() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("definitions.db");
    let store = StoreSource::new(&store_path);
    store.init().unwrap();
    store.save(&invalid_but_loadable_schema()).unwrap();

    let generator = Generator::new(config_in(dir.path()), Box::new(store));
    let result = generator.generate(None, false).unwrap();
    assert_eq!(result.outcome, RunOutcome::Success);
    assert!(dir.path().join("out/src/models/widget.rs").is_file());
}

#[test]
fn validate_trusted_flag_applies_validation_uniformly() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("definitions.db");
    let store = StoreSource::new(&store_path);
    store.init().unwrap();
    store.save(&invalid_but_loadable_schema()).unwrap();

    let mut config = config_in(dir.path());
    config.validate_trusted = true;
    let generator = Generator::new(config, Box::new(store));

    let result = generator.generate(None, false).unwrap();
    assert_eq!(result.outcome, RunOutcome::ValidationFailed);
    assert!(!dir.path().join("out").exists());
}

#[test]
fn store_records_generation_status_after_success() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("definitions.db");

    // Import the valid fixture definitions into a store first.
    let rows = TabularSource::new(fixture("entities.csv"), fixture("properties.csv"))
        .load()
        .unwrap();
    let schema = SchemaSet::from_rows(&rows).unwrap();
    let store = StoreSource::new(&store_path);
    store.init().unwrap();
    store.save(&schema).unwrap();

    let generator = Generator::new(config_in(dir.path()), Box::new(StoreSource::new(&store_path)));
    let result = generator.generate(None, false).unwrap();
    assert_eq!(result.outcome, RunOutcome::Success);

    let rows = StoreSource::new(&store_path).load().unwrap();
    for entity in &rows.entities {
        assert!(entity.generated, "{} not marked generated", entity.name);
        assert!(entity.last_generated_at.is_some());
        assert!(entity.last_log.contains("artifacts"));
    }
}

#[test]
fn model_artifacts_never_reference_later_stage_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Generator::new(config_in(dir.path()), tabular_source());
    generator.generate(None, false).unwrap();

    let models = dir.path().join("out/src/models");
    for entry in fs::read_dir(models).unwrap() {
        let path = entry.unwrap().path();
        let code = fs::read_to_string(&path).unwrap();
        for later_symbol in ["Repository", "Controller", "Resource", "Policy", "Form"] {
            assert!(
                !code.contains(later_symbol),
                "{} references later-stage symbol {later_symbol}",
                path.display()
            );
        }
    }
}
