//! `stamp`: apply a compatibility manifest to a Python test module
//!
//! Exit status: 0 on success, 1 when `--check` finds pending changes,
//! 2 on any error (nothing is written in that case).

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use stamp_rewrite::{rewrite_file, RewriteConfig, RewriteOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("stamp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Apply a compatibility manifest to a Python test module")
        .arg(
            Arg::new("manifest")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Manifest (YAML) listing released/irrelevant/bug/missing_feature entries"),
        )
        .arg(
            Arg::new("target")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Test module to rewrite"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_parser(value_parser!(PathBuf))
                .help("Write the result here instead of rewriting the target in place"),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .action(ArgAction::SetTrue)
                .help("Write nothing; exit with 1 if the target would change"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("Fail when a manifest target matches no declaration"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("no-default-release")
                .long("no-default-release")
                .action(ArgAction::SetTrue)
                .help("Do not add a placeholder release to test classes without one"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Log merge decisions"),
        )
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    let manifest = matches
        .get_one::<PathBuf>("manifest")
        .context("manifest path is required")?;
    let target = matches.get_one::<PathBuf>("target").context("target path is required")?;
    let check = matches.get_flag("check");

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => RewriteConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => RewriteConfig::default(),
    };
    if matches.get_flag("strict") {
        config = config.with_strict(true);
    }
    if matches.get_flag("no-default-release") {
        config = config.with_default_release(false);
    }

    let mut options = RewriteOptions::default().with_check(check);
    if let Some(output) = matches.get_one::<PathBuf>("output") {
        options = options.with_output(output);
    }

    let report = rewrite_file(manifest, target, &options, &config)
        .with_context(|| format!("rewriting {}", target.display()))?;
    info!(%report, "done");

    if check && report.changed {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match run(&matches) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
