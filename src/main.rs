use anyhow::{Context, Result};
use clap::Parser;
use entigen::{
    BackupsCommand, CliArgs, Command, GenerationResult, Generator, GeneratorConfig,
    LoggingConfig, RunOutcome, SchemaSet, SchemaSource, SnapshotManager, StoreCommand,
    StoreSource, TabularSource, init_logging, validate, write_tabular,
};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let args = CliArgs::parse();
    let _log_guard = init_logging(&LoggingConfig::from_env())?;
    let config = GeneratorConfig::from_args(&args)?;

    match args.command {
        Command::Generate {
            entities,
            properties,
            store,
            entity,
            dry_run,
        } => {
            let source = select_source(entities, properties, store)?;
            let generator = Generator::new(config, source);
            let result = generator.generate(entity.as_deref(), dry_run)?;
            print_result(&result);
            Ok(exit_code(&result))
        }

        Command::Validate {
            entities,
            properties,
        } => {
            let source = TabularSource::new(entities, properties);
            let rows = source.load()?;
            let report = validate(&rows);
            if report.is_valid() {
                println!("definitions valid: {} entities", rows.entities.len());
                Ok(ExitCode::SUCCESS)
            } else {
                for error in &report.errors {
                    eprintln!("error: {error}");
                }
                eprintln!("{} violation(s)", report.errors.len());
                Ok(ExitCode::FAILURE)
            }
        }

        Command::Export {
            store,
            entities,
            properties,
        } => {
            let source = StoreSource::new(store);
            let rows = source.load()?;
            let schema = SchemaSet::from_rows(&rows)?;
            write_tabular(&schema, &entities, &properties)?;
            println!(
                "exported {} entities to {} and {}",
                schema.len(),
                entities.display(),
                properties.display()
            );
            Ok(ExitCode::SUCCESS)
        }

        Command::Backups { command } => {
            let manager = SnapshotManager::new(&config.backup_root);
            match command {
                BackupsCommand::List => {
                    let snapshots = manager.list_backups()?;
                    if snapshots.is_empty() {
                        println!("no snapshots under {}", config.backup_root.display());
                    }
                    for snapshot in snapshots {
                        println!(
                            "{}  {}  {} file(s)",
                            snapshot.id,
                            snapshot.manifest.timestamp.to_rfc3339(),
                            snapshot.manifest.files.len()
                        );
                    }
                }
                BackupsCommand::Prune { retain } => {
                    let retain = retain.unwrap_or(config.retain_backups);
                    let removed = manager.prune_backups(retain)?;
                    println!("pruned {removed} snapshot(s), kept newest {retain}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Store { command } => match command {
            StoreCommand::Init { store } => {
                StoreSource::new(&store).init()?;
                println!("store initialized at {}", store.display());
                Ok(ExitCode::SUCCESS)
            }
            StoreCommand::Import {
                store,
                entities,
                properties,
            } => {
                let source = TabularSource::new(entities, properties);
                let rows = source.load()?;
                let report = validate(&rows);
                anyhow::ensure!(
                    report.is_valid(),
                    "definitions are invalid, not importing:\n{}",
                    report.errors.join("\n")
                );
                let schema = SchemaSet::from_rows(&rows)?;
                let target = StoreSource::new(&store);
                target.init()?;
                target.save(&schema)?;
                println!("imported {} entities into {}", schema.len(), store.display());
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}

/// Pick the definition source from the generate flags.
fn select_source(
    entities: Option<PathBuf>,
    properties: Option<PathBuf>,
    store: Option<PathBuf>,
) -> Result<Box<dyn SchemaSource>> {
    let selected: Result<Box<dyn SchemaSource>> = match (entities, properties, store) {
        (Some(entities), Some(properties), None) => {
            Ok(Box::new(TabularSource::new(entities, properties)))
        }
        (None, None, Some(store)) => Ok(Box::new(StoreSource::new(store))),
        _ => anyhow::bail!(
            "provide either --entities with --properties, or --store"
        ),
    };
    selected.context("selecting definition source")
}

fn print_result(result: &GenerationResult) {
    match result.outcome {
        RunOutcome::Success => {
            println!(
                "generated {} file(s) across {} entity(ies)",
                result.generated_files.len(),
                result.entity_count
            );
            for path in &result.generated_files {
                println!("  {}", path.display());
            }
            if let Some(backup) = &result.backup {
                println!("snapshot: {backup}");
            }
        }
        RunOutcome::ValidationFailed => {
            eprintln!("validation failed:");
            for error in &result.errors {
                eprintln!("  {error}");
            }
        }
        RunOutcome::NoEntitiesToGenerate => {
            println!("no entities to generate");
        }
        RunOutcome::EmitterFailed => {
            eprintln!("generation failed; pre-run state was restored:");
            for error in &result.errors {
                eprintln!("  {error}");
            }
        }
        RunOutcome::RollbackFailed => {
            eprintln!("generation failed AND rollback failed; manual recovery required:");
            for error in &result.errors {
                eprintln!("  {error}");
            }
            if let Some(backup) = &result.backup {
                eprintln!("backup folder: {backup}");
            }
        }
    }
}

fn exit_code(result: &GenerationResult) -> ExitCode {
    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
