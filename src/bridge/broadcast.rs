use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::queue::DropOldestQueue;
use super::subscribers::{FanOutReport, Frame, SubscriberId, Subscribers};
use crate::{protocol::ServerMessage, snapshot::WorldSnapshot};

/// Hand-off between the tick loop and observers: the producer pushes every
/// snapshot into a bounded queue, the drain loop ships only the newest one.
#[derive(Debug)]
pub struct BroadcastPipeline {
    queue: DropOldestQueue<Arc<WorldSnapshot>>,
    subscribers: Subscribers,
    subscriber_buffer: usize,
}

impl BroadcastPipeline {
    pub fn new(queue_capacity: usize, subscriber_buffer: usize) -> Self {
        Self {
            queue: DropOldestQueue::new(queue_capacity),
            subscribers: Subscribers::new(),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    pub fn publish(&self, snapshot: WorldSnapshot) {
        let tick = snapshot.tick;
        if self.queue.push(Arc::new(snapshot)) {
            debug!(tick, dropped_total = self.queue.dropped(), "queue full, dropped oldest snapshot");
        }
    }

    /// Replaces everything buffered with `snapshot`.
    pub fn replace(&self, snapshot: WorldSnapshot) {
        self.queue.clear();
        self.queue.push(Arc::new(snapshot));
    }

    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<Frame>) {
        self.subscribers.subscribe(self.subscriber_buffer)
    }

    pub fn register(&self, sender: mpsc::Sender<Frame>) -> SubscriberId {
        self.subscribers.insert(sender)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.unsubscribe(id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.subscribers.contains(id)
    }

    pub fn queue(&self) -> &DropOldestQueue<Arc<WorldSnapshot>> {
        &self.queue
    }

    /// Drains the queue and fans the newest snapshot out as a
    /// `state_update` frame. `None` when nothing was buffered.
    pub fn flush(&self) -> Option<FanOutReport> {
        let snapshot = self.queue.drain_latest()?;
        let message = ServerMessage::StateUpdate {
            data: snapshot.as_ref(),
        };
        let frame = match message.to_json() {
            Ok(json) => Frame::from(json),
            Err(err) => {
                warn!(tick = snapshot.tick, error = %err, "failed to serialize snapshot");
                return None;
            }
        };
        Some(self.subscribers.fan_out(&frame))
    }
}

/// Flushes the pipeline on a fixed cadence until shutdown is signalled.
pub async fn run_broadcast(
    pipeline: Arc<BroadcastPipeline>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }
        if let Some(report) = pipeline.flush() {
            if report.pruned > 0 {
                debug!(delivered = report.delivered, pruned = report.pruned, "broadcast");
            }
        }
    }
    debug!("broadcast loop stopped");
}
