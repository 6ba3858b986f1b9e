use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, warn};

pub type SubscriberId = u64;
pub type Frame = Arc<str>;

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub delivered: usize,
    pub pruned: usize,
}

/// Registry of live subscribers, each behind its own bounded channel. A
/// subscriber whose send fails is removed; the rest are unaffected.
#[derive(Debug, Default)]
pub struct Subscribers {
    next_id: AtomicU64,
    senders: Mutex<HashMap<SubscriberId, mpsc::Sender<Frame>>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Frame>>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, buffer: usize) -> (SubscriberId, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, tx);
        debug!(subscriber = id, "subscriber registered");
        (id, rx)
    }

    /// Registers an externally created sender.
    pub fn insert(&self, sender: mpsc::Sender<Frame>) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, sender);
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.lock().remove(&id).is_some() {
            debug!(subscriber = id, "subscriber removed");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn fan_out(&self, frame: &Frame) -> FanOutReport {
        let mut senders = self.lock();
        let mut report = FanOutReport::default();
        senders.retain(|id, sender| match sender.try_send(frame.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(err) => {
                warn!(subscriber = *id, error = %err, "pruning subscriber");
                report.pruned += 1;
                false
            }
        });
        report
    }
}
