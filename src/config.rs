//! Run configuration: CLI arguments, environment fallbacks, optional
//! YAML/JSON config file, merged into one [`GeneratorConfig`].
//!
//! Stage toggles are explicit per-invocation values handed to the
//! orchestrator, never globals, so several configurations can coexist in
//! one process (and in tests).

use crate::emit::StageKind;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DEFAULT_RETAIN_BACKUPS: usize = 10;

/// Effective configuration of one generator invocation.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Root of the target source tree artifacts are written under.
    pub output_root: PathBuf,
    /// Where snapshots live.
    pub backup_root: PathBuf,
    /// Stages to run; `None` means all of them.
    pub enabled_stages: Option<HashSet<StageKind>>,
    /// Snapshots kept by `backups prune`.
    pub retain_backups: usize,
    /// Run the validator even for trusted store sources.
    pub validate_trusted: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            backup_root: PathBuf::from(".entigen/backups"),
            enabled_stages: None,
            retain_backups: DEFAULT_RETAIN_BACKUPS,
            validate_trusted: false,
        }
    }
}

impl GeneratorConfig {
    /// Merge CLI arguments over an optional config file over the defaults.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let file = match args.config.as_deref() {
            Some(path) => load_config_file(path)?,
            None => PartialConfig::default(),
        };
        let defaults = Self::default();

        let enabled_stages = args
            .stages
            .clone()
            .or(file.stages)
            .map(|tokens| parse_stages(&tokens))
            .transpose()?;

        Ok(Self {
            output_root: args
                .output_root
                .clone()
                .or(file.output_root)
                .unwrap_or(defaults.output_root),
            backup_root: args
                .backup_root
                .clone()
                .or(file.backup_root)
                .unwrap_or(defaults.backup_root),
            enabled_stages,
            retain_backups: args
                .retain_backups
                .or(file.retain_backups)
                .unwrap_or(DEFAULT_RETAIN_BACKUPS)
                .max(1),
            validate_trusted: args.validate_trusted || file.validate_trusted.unwrap_or(false),
        })
    }

    /// Whether a stage runs under this configuration.
    pub fn is_stage_enabled(&self, kind: StageKind) -> bool {
        match &self.enabled_stages {
            Some(set) => set.contains(&kind),
            None => true,
        }
    }
}

fn parse_stages(tokens: &[String]) -> Result<HashSet<StageKind>> {
    let mut stages = HashSet::new();
    for token in tokens {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        let stage = StageKind::from_str(trimmed).with_context(|| {
            format!(
                "unknown stage `{trimmed}` (expected one of: model, api-resource, repository, \
                 controller, policy, form, page-template, model-test, api-test, repository-test, \
                 controller-test)"
            )
        })?;
        stages.insert(stage);
    }
    anyhow::ensure!(!stages.is_empty(), "at least one stage must be enabled");
    Ok(stages)
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    output_root: Option<PathBuf>,
    backup_root: Option<PathBuf>,
    stages: Option<Vec<String>>,
    retain_backups: Option<usize>,
    validate_trusted: Option<bool>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    anyhow::ensure!(path.exists(), "config file {:?} does not exist", path);
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {path:?}"))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {path:?}"))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {path:?}"))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}

// ============================================================================
// CLI surface
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "entigen", about = "Schema-driven scaffolding generator", version)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        global = true,
        help = "Path to a configuration file (YAML or JSON)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "ENTIGEN_OUTPUT_ROOT",
        value_name = "DIR",
        global = true,
        help = "Root of the target source tree"
    )]
    pub output_root: Option<PathBuf>,

    #[arg(
        long,
        env = "ENTIGEN_BACKUP_ROOT",
        value_name = "DIR",
        global = true,
        help = "Directory snapshots are stored under"
    )]
    pub backup_root: Option<PathBuf>,

    #[arg(
        long,
        env = "ENTIGEN_STAGES",
        value_name = "STAGE",
        value_delimiter = ',',
        global = true,
        help = "Restrict the run to the given emitter stages"
    )]
    pub stages: Option<Vec<String>>,

    #[arg(
        long,
        env = "ENTIGEN_RETAIN_BACKUPS",
        value_name = "N",
        global = true,
        help = "Snapshots kept when pruning"
    )]
    pub retain_backups: Option<usize>,

    #[arg(
        long,
        global = true,
        help = "Run semantic validation even for trusted store sources"
    )]
    pub validate_trusted: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate artifacts from a definition source.
    Generate {
        /// Entity table (CSV). Requires --properties.
        #[arg(long, value_name = "FILE", requires = "properties", conflicts_with = "store")]
        entities: Option<PathBuf>,
        /// Property table (CSV).
        #[arg(long, value_name = "FILE")]
        properties: Option<PathBuf>,
        /// Definition store (SQLite) instead of CSV tables.
        #[arg(long, value_name = "FILE")]
        store: Option<PathBuf>,
        /// Only generate the named entity.
        #[arg(long, value_name = "NAME")]
        entity: Option<String>,
        /// Parse, validate and plan, but do not touch the filesystem.
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate tabular definitions and report violations.
    Validate {
        #[arg(long, value_name = "FILE")]
        entities: PathBuf,
        #[arg(long, value_name = "FILE")]
        properties: PathBuf,
    },

    /// Export a definition store back to the two CSV tables.
    Export {
        #[arg(long, value_name = "FILE")]
        store: PathBuf,
        #[arg(long, value_name = "FILE")]
        entities: PathBuf,
        #[arg(long, value_name = "FILE")]
        properties: PathBuf,
    },

    /// Inspect or prune snapshots.
    Backups {
        #[command(subcommand)]
        command: BackupsCommand,
    },

    /// Manage the definition store.
    Store {
        #[command(subcommand)]
        command: StoreCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum BackupsCommand {
    /// List snapshots, newest first.
    List,
    /// Delete all but the newest N snapshots.
    Prune {
        /// Overrides the configured retention count.
        #[arg(long, value_name = "N")]
        retain: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum StoreCommand {
    /// Create the definition tables.
    Init {
        #[arg(long, value_name = "FILE")]
        store: PathBuf,
    },
    /// Validate tabular definitions and import them into a store.
    Import {
        #[arg(long, value_name = "FILE")]
        store: PathBuf,
        #[arg(long, value_name = "FILE")]
        entities: PathBuf,
        #[arg(long, value_name = "FILE")]
        properties: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_enable_all_stages() {
        let config = GeneratorConfig::default();
        assert!(config.is_stage_enabled(StageKind::Model));
        assert!(config.is_stage_enabled(StageKind::ControllerTest));
        assert_eq!(config.retain_backups, DEFAULT_RETAIN_BACKUPS);
        assert!(!config.validate_trusted);
    }

    #[test]
    fn stage_restriction_disables_the_rest() {
        let stages = parse_stages(&["model".to_string(), "repository".to_string()]).unwrap();
        let config = GeneratorConfig {
            enabled_stages: Some(stages),
            ..Default::default()
        };
        assert!(config.is_stage_enabled(StageKind::Model));
        assert!(config.is_stage_enabled(StageKind::Repository));
        assert!(!config.is_stage_enabled(StageKind::Controller));
        assert!(!config.is_stage_enabled(StageKind::ModelTest));
    }

    #[test]
    fn unknown_stage_is_rejected() {
        assert!(parse_stages(&["viewmodel".to_string()]).is_err());
    }

    #[test]
    fn yaml_config_file_merges_under_cli() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "output_root: /srv/app\nstages:\n  - model\nretain_backups: 3"
        )
        .unwrap();
        file.flush().unwrap();

        let args = CliArgs::parse_from([
            "entigen",
            "--config",
            file.path().to_str().unwrap(),
            "generate",
            "--store",
            "defs.db",
        ]);
        let config = GeneratorConfig::from_args(&args).unwrap();
        assert_eq!(config.output_root, PathBuf::from("/srv/app"));
        assert_eq!(config.retain_backups, 3);
        assert!(config.is_stage_enabled(StageKind::Model));
        assert!(!config.is_stage_enabled(StageKind::Form));
    }
}
