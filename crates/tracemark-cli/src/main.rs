//! `tracemark` command line
//!
//! Exit codes: `0` pass, `1` validation failed, `2` fatal error (bad
//! configuration, missing root, broken template).

mod cli;

use clap::ArgMatches;
use std::path::PathBuf;
use std::process::ExitCode;
use tracemark_core::{CheckSet, Engine, Report};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli::command().get_matches();
    if let Err(error) = init_tracing(matches.get_flag("verbose")) {
        eprintln!("tracemark: {error:#}");
        return ExitCode::from(2);
    }

    match run(&matches).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(error) => {
            tracing::error!("{error:#}");
            eprintln!("tracemark: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

/// Execute the selected subcommand; `Ok(false)` means validation failed
async fn run(matches: &ArgMatches) -> anyhow::Result<bool> {
    let config = cli::engine_config(matches)?;
    let json = matches.get_flag("json");
    let engine = Engine::new(config).await?;

    match matches.subcommand() {
        Some(("validate", args)) => {
            let focus = args.get_one::<PathBuf>("artifact");
            let report = engine.validate(CheckSet::All, focus.map(PathBuf::as_path)).await?;
            emit(&report, json)
        }
        Some(("check-refs", _)) => {
            let report = engine.validate(CheckSet::CrossReferences, None).await?;
            emit(&report, json)
        }
        Some(("validate-code", _)) => {
            let report = engine.validate(CheckSet::Traceability, None).await?;
            emit(&report, json)
        }
        Some(("list-ids", args)) => {
            let prefix = args.get_one::<String>("prefix").map_or("", String::as_str);
            list_ids(&engine, prefix, json).await?;
            Ok(true)
        }
        _ => anyhow::bail!("unknown subcommand"),
    }
}

fn emit(report: &Report, json: bool) -> anyhow::Result<bool> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(report.passed())
}

async fn list_ids(engine: &Engine, prefix: &str, json: bool) -> anyhow::Result<()> {
    let run = engine.run(CheckSet::CrossReferences).await?;
    let ids = run.registry.ids_with_prefix(prefix);

    let rows: Vec<serde_json::Value> = ids
        .iter()
        .filter_map(|id| {
            let entry = run.registry.lookup(id.as_str())?;
            let def = entry.canonical()?;
            Some(serde_json::json!({
                "id": id.as_str(),
                "path": def.path.to_string_lossy().replace('\\', "/"),
                "line": def.line,
                "kind": def.kind.as_ref().map(|k| k.as_str()),
                "references": entry.references.len(),
                "code_markers": entry.code_markers.len(),
            }))
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!(
                "{}\t{}:{}",
                row["id"].as_str().unwrap_or_default(),
                row["path"].as_str().unwrap_or_default(),
                row["line"]
            );
        }
    }
    Ok(())
}
