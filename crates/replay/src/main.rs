//! Eyewatch - Replay Entry Point

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use replay::{alert_manager, init_logging, settings, Replay};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;

/// Replay a recorded face-detector stream through the drowsiness monitor
#[derive(Debug, Parser)]
#[command(name = "eyewatch", version)]
struct Cli {
    /// JSON-lines record file ("-" or omitted for stdin)
    input: Option<PathBuf>,

    /// Settings file (TOML, YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Threshold preset: default, strict or lenient
    #[arg(long)]
    preset: Option<String>,

    /// Run with both alert channels unavailable
    #[arg(long)]
    no_audio: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    info!("=== Eyewatch v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = if cli.metrics {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install metrics recorder")?,
        )
    } else {
        None
    };

    let config = settings::load_config(cli.config.as_deref(), cli.preset.as_deref())?;
    info!(?config, "Monitor configured");

    let mut replay = Replay::new(config, alert_manager(!cli.no_audio))?;
    let stdout = tokio::io::stdout();

    let summary = match cli.input.filter(|p| p.as_os_str() != "-") {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            replay.run(BufReader::new(file), stdout).await?
        }
        None => replay.run(BufReader::new(tokio::io::stdin()), stdout).await?,
    };

    info!(
        frames = summary.frames,
        skipped = summary.skipped_frames,
        mild_alerts = summary.mild_alerts,
        severe_alerts = summary.severe_alerts,
        peak = ?summary.peak_level,
        "Replay finished"
    );

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }

    Ok(())
}
