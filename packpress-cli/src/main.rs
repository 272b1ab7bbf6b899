// packpress-cli/src/main.rs
//
// Command-line interface for the packpress pipeline. Responsibilities:
// - Parsing CLI arguments (`run` and `check` subcommands).
// - Loading and validating the TOML configuration.
// - Setting up console/file logging.
// - Invoking the core pipeline and summarizing results.
// - Mapping startup failures (config, auth, source directory) to a
//   non-zero exit code. Individual job failures do not fail the process.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use packpress_core::{run_pipeline, Config, JobState, UploadClient};
use std::path::PathBuf;
use std::process;

mod logging;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "packpress: archive normalization and publishing pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process every archive in the configured source directory
    Run(CommonArgs),
    /// Probe the upload endpoint and report reachability
    Check(CommonArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Path to the TOML configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Enable debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => run_command(args),
        Commands::Check(args) => check_command(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn setup(args: &CommonArgs) -> anyhow::Result<(Config, UploadClient)> {
    let config = Config::load(&args.config)
        .with_context(|| format!("loading '{}'", args.config.display()))?;
    logging::init(&config.logger, args.verbose).context("initializing logging")?;
    config.validate()?;

    // The only fatal-at-construction check in the core: incomplete auth
    // aborts the whole run before any job starts.
    let client = UploadClient::new(&config)?;
    Ok((config, client))
}

fn run_command(args: CommonArgs) -> anyhow::Result<()> {
    let (config, client) = setup(&args)?;

    info!("{}", "=".repeat(60));
    info!("scanning '{}'", config.source.directory.display());

    let reports = run_pipeline(&config, &client)?;

    let completed = reports
        .iter()
        .filter(|r| r.state == JobState::Completed)
        .count();
    let skipped = reports
        .iter()
        .filter(|r| r.state == JobState::Skipped)
        .count();
    let failed = reports
        .iter()
        .filter(|r| r.state == JobState::Failed)
        .count();

    info!("{}", "=".repeat(60));
    info!(
        "run finished: {completed} completed, {skipped} skipped, {failed} failed ({} total)",
        reports.len()
    );
    for report in reports.iter().filter(|r| r.state == JobState::Failed) {
        error!(
            "  {}: {}",
            report.archive,
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    if failed > 0 {
        warn!("{failed} jobs failed; see the log above for causes");
    }
    info!("{}", "=".repeat(60));
    Ok(())
}

fn check_command(args: CommonArgs) -> anyhow::Result<()> {
    let (config, client) = setup(&args)?;

    if client.test_connection() {
        info!("upload endpoint '{}' is reachable", config.url.upload);
        Ok(())
    } else {
        anyhow::bail!("upload endpoint '{}' is not reachable", config.url.upload)
    }
}
