//! Concurrency bridge between the tick loop and observers.
//!
//! One task advances the model, a second drains the snapshot queue on a
//! slower cadence, and control commands arrive from request handlers. All
//! three meet at [`SimHandle`].

mod broadcast;
mod handle;
mod queue;
mod runner;
mod subscribers;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

pub use broadcast::{run_broadcast, BroadcastPipeline};
pub use handle::SimHandle;
pub use queue::DropOldestQueue;
pub use runner::run_simulation;
pub use subscribers::{FanOutReport, Frame, SubscriberId, Subscribers};

/// The two background loops plus the signal that stops them.
pub struct BridgeTasks {
    shutdown: watch::Sender<bool>,
    runner: JoinHandle<()>,
    broadcaster: JoinHandle<()>,
}

impl BridgeTasks {
    pub fn spawn(handle: Arc<SimHandle>) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let tick_interval = Duration::from_millis(handle.runtime().tick_interval_ms.max(1));
        let broadcast_interval =
            Duration::from_millis(handle.runtime().broadcast_interval_ms.max(1));
        let runner = tokio::spawn(run_simulation(handle.clone(), tick_interval, rx.clone()));
        let broadcaster = tokio::spawn(run_broadcast(
            handle.pipeline().clone(),
            broadcast_interval,
            rx,
        ));
        Self {
            shutdown,
            runner,
            broadcaster,
        }
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        join_task("simulation", self.runner).await;
        join_task("broadcast", self.broadcaster).await;
    }
}

/// Waits for a background loop; a panicked or cancelled loop is logged and
/// reported as `false`.
async fn join_task(name: &'static str, task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(err) => {
            warn!(task = name, error = %err, "background task did not finish cleanly");
            false
        }
    }
}
