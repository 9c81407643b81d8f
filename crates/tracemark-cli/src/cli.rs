//! Command line definition and configuration resolution

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use tracemark_core::EngineConfig;

/// Config file picked up from the working directory when `--config` is absent
pub(crate) const DEFAULT_CONFIG: &str = "tracemark.toml";

pub(crate) fn command() -> Command {
    Command::new("tracemark")
        .version(tracemark_core::VERSION)
        .about("Validate marker-annotated documents, identifier references and code traceability")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (default: ./tracemark.toml when present)"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Artifact root; replaces the configured roots"),
        )
        .arg(
            Arg::new("code-root")
                .long("code-root")
                .global(true)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Source root; replaces the configured roots"),
        )
        .arg(
            Arg::new("templates")
                .long("templates")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Template directory"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Output as JSON"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging (RUST_LOG takes precedence)"),
        )
        .subcommand(
            Command::new("validate")
                .about("Run every check and report a score")
                .arg(
                    Arg::new("artifact")
                        .long("artifact")
                        .value_parser(value_parser!(PathBuf))
                        .help("Report only findings located in this artifact"),
                ),
        )
        .subcommand(
            Command::new("list-ids")
                .about("List defined identifiers")
                .arg(
                    Arg::new("prefix")
                        .long("prefix")
                        .help("Only identifiers starting with this prefix"),
                ),
        )
        .subcommand(Command::new("check-refs").about("Check orphans, duplicates and coverage"))
        .subcommand(Command::new("validate-code").about("Check code markers against the documents"))
}

/// Configuration from file plus command line overrides
pub(crate) fn engine_config(matches: &ArgMatches) -> anyhow::Result<EngineConfig> {
    let explicit = matches.get_one::<PathBuf>("config");
    let mut config = match explicit {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).is_file() => EngineConfig::load(Path::new(DEFAULT_CONFIG))
            .with_context(|| format!("loading {DEFAULT_CONFIG}"))?,
        None => EngineConfig::default(),
    };

    if let Some(roots) = matches.get_many::<PathBuf>("root") {
        config.artifact_roots = roots.cloned().collect();
    }
    if let Some(roots) = matches.get_many::<PathBuf>("code-root") {
        config.code_roots = roots.cloned().collect();
    }
    if let Some(dir) = matches.get_one::<PathBuf>("templates") {
        config.template_dir = Some(dir.clone());
    }

    let focus = matches
        .subcommand_matches("validate")
        .and_then(|m| m.get_one::<PathBuf>("artifact"));
    if config.artifact_roots.is_empty() {
        config.artifact_roots = vec![focus.cloned().unwrap_or_else(|| PathBuf::from("."))];
    }
    Ok(config)
}
