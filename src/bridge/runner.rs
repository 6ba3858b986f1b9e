use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use super::handle::SimHandle;
use crate::model::StepOutcome;

/// Ticks the model at a fixed cadence. While paused the loop parks until
/// `start` is called; shutdown is checked at the top of every iteration and
/// interrupts either wait.
pub async fn run_simulation(
    handle: Arc<SimHandle>,
    tick_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        if !handle.is_running().await {
            tokio::select! {
                _ = handle.resumed() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            continue;
        }

        if let StepOutcome::Ended { tick } = handle.tick_once().await {
            info!(tick, "simulation ended; waiting for reset");
        }

        tokio::select! {
            _ = tokio::time::sleep(tick_interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    debug!("simulation loop stopped");
}
