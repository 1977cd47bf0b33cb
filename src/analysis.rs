//! One cycle of the pipeline: fetch, analyze, write, report.

use crate::config::AppConfig;
use crate::{comfy_table, fetch_markets, market_stats, spreadsheet};
use chrono::Utc;
use reqwest::Client;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The data sheet now holds `rows` coin rows.
    Written { rows: usize },
    /// Fetch failed or returned nothing; no write was attempted.
    Skipped,
    /// Data was fetched but the workbook could not be updated.
    WriteFailed,
}

/// Runs the full analysis pipeline once:
/// 1. Fetches the market snapshot.
/// 2. Computes the summary statistics.
/// 3. Replaces the data sheet and prints the console summary.
///
/// Never fails. Errors are logged and reported through the outcome so the
/// scheduler can carry on with the next cycle.
pub async fn run_analysis_pipeline(client: &Client, config: &AppConfig) -> CycleOutcome {
    // Step 1: Fetch
    let snapshot = fetch_markets::fetch(client, &config.endpoint_url).await;
    if snapshot.is_empty() {
        info!("No market data this cycle, skipping write");
        return CycleOutcome::Skipped;
    }
    let taken_at = Utc::now();

    // Step 2: Analyze
    let analysis = market_stats::analyze(&snapshot);

    // Step 3: Write
    let rows = snapshot.len();
    let path = config.output_path.clone();
    let sheet_name = config.sheet_name.clone();
    let written = {
        let analysis = analysis.clone();
        tokio::task::spawn_blocking(move || {
            spreadsheet::write(&path, &sheet_name, &snapshot, &analysis)
        })
        .await
    };

    match written {
        Ok(Ok(())) => {
            info!(
                rows,
                path = %config.output_path.display(),
                "Excel updated with latest data"
            );
            comfy_table::print_summary(&analysis, taken_at);
            CycleOutcome::Written { rows }
        }
        Ok(Err(e)) => {
            error!("Error writing spreadsheet: {}", e);
            CycleOutcome::WriteFailed
        }
        Err(e) => {
            error!("Spreadsheet writer task failed: {}", e);
            CycleOutcome::WriteFailed
        }
    }
}
