use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use fd_config::{FraudConfig, HumanDuration, InputSource};
use fd_runtime::lifecycle::{FraudEngine, wait_for_signal};
use fd_runtime::source::scan_file;
use fd_runtime::tracing_init::init_tracing;

#[derive(Parser)]
#[command(name = "fraud-engine", about = "Dynamic-rule fraud detection engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the configured input through the rule evaluator
    Run {
        /// Path to fraud.toml config file
        #[arg(short, long)]
        config: PathBuf,
        /// Enable runtime metrics and periodic snapshot output
        #[arg(long)]
        metrics: bool,
        /// Override metrics report interval (e.g. "2s", "30s", "1m")
        #[arg(long)]
        metrics_interval: Option<String>,
    },
    /// Validate the config and decode every input line without evaluating
    Check {
        /// Path to fraud.toml config file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            metrics,
            metrics_interval,
        } => run(&config, metrics, metrics_interval).await,
        Commands::Check { config } => check(&config),
    }
}

fn load_config(config: &Path) -> Result<(FraudConfig, PathBuf)> {
    let config_path = config
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("config path '{}': {e}", config.display()))?;
    let fraud_config = FraudConfig::load(&config_path)?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("config path '{}' has no parent directory", config_path.display()))?;
    Ok((fraud_config, base_dir))
}

async fn run(config: &Path, metrics: bool, metrics_interval: Option<String>) -> Result<()> {
    let (mut fraud_config, base_dir) = load_config(config)?;
    if metrics || metrics_interval.is_some() {
        fraud_config.metrics.enabled = true;
    }
    if let Some(interval) = metrics_interval {
        fraud_config.metrics.report_interval = HumanDuration::from_str(&interval)
            .map_err(|e| anyhow::anyhow!("invalid --metrics-interval '{interval}': {e}"))?;
    }
    let metrics_enabled = fraud_config.metrics.enabled;
    let report_interval = fraud_config.metrics.report_interval;

    let _guard = init_tracing(&fraud_config.logging, &base_dir)?;

    let engine = FraudEngine::start(fraud_config, &base_dir)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    if metrics_enabled {
        tracing::info!(domain = "res", interval = %report_interval, "runtime metrics enabled");
    }

    // Stop on a signal or once the input is exhausted, whichever comes first.
    let input_done = engine.input_done_token();
    tokio::select! {
        _ = wait_for_signal(engine.cancel_token()) => engine.shutdown(),
        _ = input_done.cancelled() => {
            tracing::info!(domain = "sys", "input exhausted, draining");
        }
    }
    engine.wait().await.map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}

fn check(config: &Path) -> Result<()> {
    let (fraud_config, base_dir) = load_config(config)?;
    let path = match fraud_config.input.resolve(&base_dir) {
        InputSource::File(path) => path,
        InputSource::Stdin => anyhow::bail!("check needs a file input; input.path is '-'"),
    };

    let summary = scan_file(&path)?;
    println!(
        "{}: {} rule updates, {} envelopes, {} malformed",
        path.display(),
        summary.rules,
        summary.envelopes,
        summary.malformed.len()
    );
    for (line, error) in &summary.malformed {
        println!("  line {line}: {error}");
    }
    if !summary.malformed.is_empty() {
        anyhow::bail!("{} malformed input line(s)", summary.malformed.len());
    }
    Ok(())
}
