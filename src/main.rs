use anyhow::{Context, Result};
use npm_super_pack::backup::{backup_pipeline, confirm_packages, BackupPlan};
use npm_super_pack::cli::output::*;
use npm_super_pack::cli::Cli;
use npm_super_pack::core::{BackupConfig, Outcome, Payload};
use npm_super_pack::npm::{NpmClient, PackageManager};
use npm_super_pack::prompt::Confirmer;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::BufReader;
use tracing::{error, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Trace of a `--debug` run, written next to the digest
const TRACE_FILE: &str = "npm-super-pack-trace.json";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG overrides the level picked by the flags
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(cli.log_level()).into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set logging subscriber")?;

    let config = BackupConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let mut plan = cli.backup_plan(&config);
    if plan.packages.is_empty() {
        println!("{} No valid package names were given", CROSS);
        std::process::exit(1);
    }

    let manager: Arc<dyn PackageManager> = Arc::new(NpmClient::new(cli.npm_path(&config), config.npm_timeout_secs));

    if cli.dry_run {
        print_plan(&plan, manager);
        return Ok(());
    }

    if !cli.yes {
        let mut stdin = BufReader::new(tokio::io::stdin());
        plan.packages = confirm_packages(&plan.packages, manager.as_ref(), &Confirmer::affirmer(), &mut stdin).await?;
        if plan.packages.is_empty() {
            println!("{} Nothing to back up", INFO);
            return Ok(());
        }
    }

    let (outcome, elapsed) = run_backup(&plan, manager).await;
    println!("{}", format_outcome(&outcome, elapsed));

    if plan.env.use_debug {
        write_trace(&outcome, &plan.destination);
    }

    if !outcome.is_success() {
        error!("Backup failed with exit code {}", outcome.exit_code());
        std::process::exit(outcome.exit_code());
    }

    Ok(())
}

fn print_plan(plan: &BackupPlan, manager: Arc<dyn PackageManager>) {
    let pipeline = backup_pipeline(plan, manager).lock();
    println!(
        "{} Dry run: {} package(s) into {}",
        INFO,
        style(plan.packages.len()).cyan(),
        style(plan.destination.display()).bold()
    );
    println!("{}", format_outline(&pipeline.outline()));
}

async fn run_backup(plan: &BackupPlan, manager: Arc<dyn PackageManager>) -> (Outcome, Duration) {
    let pipeline = backup_pipeline(plan, manager);
    let spinner = create_spinner(&format!("Backing up {} package(s)", plan.packages.len()));
    let started = Instant::now();

    let outcome = pipeline.start(Payload::empty()).await;

    spinner.finish_and_clear();
    (outcome, started.elapsed())
}

fn write_trace(outcome: &Outcome, destination: &Path) {
    let Some(trace) = outcome.trace() else {
        return;
    };
    let path = destination.join(TRACE_FILE);
    let written = trace
        .to_json()
        .map_err(anyhow::Error::from)
        .and_then(|json| std::fs::write(&path, json).map_err(anyhow::Error::from));
    match written {
        Ok(()) => println!("{} Trace written to {}", INFO, style(path.display()).dim()),
        Err(e) => warn!("Failed to write trace to {}: {}", path.display(), e),
    }
}
