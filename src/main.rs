mod analysis;
mod comfy_table;
mod config;
mod fetch_markets;
mod market_stats;
mod scheduler;
mod spreadsheet;
#[cfg(test)]
mod test_support;

use clap::Parser;
use config::{AppConfig, ConfigOverrides};
use scheduler::Shutdown;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Keeps a spreadsheet up to date with the top cryptocurrencies by market cap.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// JSON config file; flags and environment variables override its values
    #[arg(long, short = 'c', env = "TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Market data endpoint, query string included
    #[arg(long, env = "TRACKER_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Spreadsheet to create or update
    #[arg(long, short = 'o', env = "TRACKER_OUTPUT_PATH")]
    output_path: Option<PathBuf>,

    /// Seconds to wait between cycles
    #[arg(long = "interval", env = "TRACKER_POLL_INTERVAL_SECONDS")]
    poll_interval_seconds: Option<u64>,

    /// Upper bound in seconds for one HTTP request
    #[arg(long = "timeout", env = "TRACKER_REQUEST_TIMEOUT_SECONDS")]
    request_timeout_seconds: Option<u64>,

    /// Name of the sheet that is replaced every cycle
    #[arg(long, env = "TRACKER_SHEET_NAME")]
    sheet_name: Option<String>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            endpoint_url: self.endpoint_url.clone(),
            output_path: self.output_path.clone(),
            poll_interval_seconds: self.poll_interval_seconds,
            request_timeout_seconds: self.request_timeout_seconds,
            sheet_name: self.sheet_name.clone(),
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();
}

/// Resolves once `listener` reports its signal. A listener that could not be
/// installed never resolves, so it cannot stop the loop by itself.
async fn signal_or_pending<F>(name: &str, listener: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = listener.await {
        error!("Unable to listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = signal_or_pending("Ctrl+C", tokio::signal::ctrl_c()) => {}
                    Some(()) = term.recv() => {}
                }
            }
            Err(e) => {
                error!("Unable to listen for SIGTERM: {}", e);
                signal_or_pending("Ctrl+C", tokio::signal::ctrl_c()).await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        signal_or_pending("Ctrl+C", tokio::signal::ctrl_c()).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let app_config = AppConfig::resolve(cli.config.as_deref(), cli.overrides()).await?;
    info!(
        endpoint = %app_config.endpoint_url,
        output = %app_config.output_path.display(),
        interval_secs = app_config.poll_interval_seconds,
        "Starting live cryptocurrency data update..."
    );

    let client = fetch_markets::build_client(app_config.request_timeout())?;

    if cli.once {
        let outcome = analysis::run_analysis_pipeline(&client, &app_config).await;
        info!(?outcome, "Single cycle finished");
        return Ok(());
    }

    let (shutdown, shutdown_rx) = Shutdown::new();
    tokio::spawn(async move {
        termination_signal().await;
        info!("Shutdown signal received, stopping after the current step");
        shutdown.trigger();
    });

    scheduler::run(&client, &app_config, shutdown_rx).await;
    Ok(())
}
