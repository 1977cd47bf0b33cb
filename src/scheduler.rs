use crate::analysis::{self, CycleOutcome};
use crate::config::AppConfig;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Sending side of the cooperative shutdown signal.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn trigger(&self) {
        // No receivers left means the loop is already gone.
        let _ = self.tx.send(true);
    }
}

fn is_shutdown(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow()
}

/// Waits for `duration` unless shutdown arrives first. Returns `true` when the
/// loop should stop.
async fn wait_or_shutdown(duration: Duration, rx: &mut watch::Receiver<bool>) -> bool {
    if is_shutdown(rx) {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        changed = rx.changed() => {
            // A dropped sender can never signal again, treat it as shutdown.
            changed.is_err() || is_shutdown(rx)
        }
    }
}

/// RUNNING / WAITING loop. Each cycle is followed by the full poll interval,
/// measured from the end of the cycle. Returns how many cycles ran.
pub async fn run(
    client: &Client,
    config: &AppConfig,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let interval = config.poll_interval();
    let mut cycles = 0;

    loop {
        if is_shutdown(&shutdown) {
            break;
        }

        let outcome = analysis::run_analysis_pipeline(client, config).await;
        cycles += 1;
        debug!(cycle = cycles, ?outcome, "cycle finished");
        if outcome == CycleOutcome::WriteFailed {
            info!("Will retry on the next cycle");
        }

        info!("Next update in {}s", interval.as_secs());
        if wait_or_shutdown(interval, &mut shutdown).await {
            break;
        }
    }

    info!(cycles, "Scheduler stopped");
    cycles
}
