use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use testtopo_history::{ChangeClassifier, LogicalChange};
use testtopo_manifest::Resolution;
use testtopo_resolver::{CollectingSink, Diagnostic, SuiteChanges, TestTopology};
use testtopo_store::{InMemoryObjectStore, ObjectStore};
use testtopo_types::SuiteKind;

use crate::cli::*;
use crate::config::CliConfig;
use crate::import::import_dir;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Suites(args) => cmd_suites(args, &config, cli.format),
        Command::Classify(args) => cmd_classify(args, &config, cli.format),
    }
}

#[derive(Serialize)]
struct SuitesReport<'a> {
    commit: String,
    suites: &'a BTreeMap<SuiteKind, Resolution>,
    diagnostics: Vec<String>,
}

#[derive(Serialize)]
struct ClassifyReport<'a> {
    commit: String,
    changes: &'a SuiteChanges,
    diagnostics: Vec<String>,
}

fn cmd_suites(args: SuitesArgs, config: &CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    let store = Arc::new(InMemoryObjectStore::new());
    let commit = import_dir(&*store, &args.dir, Vec::new())?;
    let sink = Arc::new(CollectingSink::new());

    let mut topology = TestTopology::new(store, config.resolver.clone(), sink.clone());
    topology
        .update(&commit)
        .with_context(|| format!("resolving {}", args.dir.display()))?;
    let diagnostics = sink.take_all();

    if format == OutputFormat::Json {
        let report = SuitesReport {
            commit: commit.to_hex(),
            suites: topology.summaries(),
            diagnostics: diagnostics.iter().map(ToString::to_string).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Snapshot {}", commit.short_hex().dimmed());
    if topology.summaries().is_empty() {
        println!("No manifest-backed suites declared.");
    }
    for (kind, resolution) in topology.summaries() {
        println!(
            "  {} {:>6} tests  {:>6} paths",
            format!("{kind:<24}").cyan().bold(),
            resolution.test_count,
            resolution.relevant_paths.len()
        );
        if args.paths {
            for path in &resolution.relevant_paths {
                println!("      {}", path);
            }
        }
    }
    print_diagnostics(&diagnostics);
    Ok(())
}

fn cmd_classify(
    args: ClassifyArgs,
    config: &CliConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = Arc::new(InMemoryObjectStore::new());
    let before = import_dir(&*store, &args.before, Vec::new())?;
    let after = import_dir(&*store, &args.after, vec![before])?;
    let sink = Arc::new(CollectingSink::new());

    let store: Arc<dyn ObjectStore> = store;
    let mut classifier = ChangeClassifier::new(
        store,
        config.resolver.clone(),
        config.history.clone(),
        sink.clone(),
    );
    let change = LogicalChange::new(after.short_hex(), Utc::now(), vec![after]);
    let record = classifier.classify(&change)?;
    let diagnostics = sink.take_all();

    if format == OutputFormat::Json {
        let report = ClassifyReport {
            commit: after.to_hex(),
            changes: &record.changes,
            diagnostics: diagnostics.iter().map(ToString::to_string).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if record.changes.is_empty() {
        println!("{} No test suites touched.", "✓".green());
    }
    let statuses = [
        ("added", &record.changes.added),
        ("modified", &record.changes.modified),
    ];
    for (label, suites) in statuses {
        if suites.is_empty() {
            continue;
        }
        let names: Vec<String> = suites
            .iter()
            .map(|s| s.to_string().cyan().to_string())
            .collect();
        println!("  {} {}", format!("{:<9}", format!("{label}:")).green(), names.join(", "));
    }
    print_diagnostics(&diagnostics);
    Ok(())
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!("\n{} {} diagnostic(s):", "!".yellow().bold(), diagnostics.len());
    for diagnostic in diagnostics {
        println!("  {}", diagnostic.to_string().yellow());
    }
}
