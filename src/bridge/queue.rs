use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Bounded hand-off buffer. A push never blocks: when full, the oldest
/// entry is discarded to make room.
#[derive(Debug)]
pub struct DropOldestQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` when an older entry had to be dropped.
    pub fn push(&self, item: T) -> bool {
        let mut items = self.lock();
        let mut evicted = false;
        while items.len() >= self.capacity {
            items.pop_front();
            evicted = true;
        }
        items.push_back(item);
        if evicted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        evicted
    }

    /// Empties the queue and returns only the newest entry.
    pub fn drain_latest(&self) -> Option<T> {
        let mut items = self.lock();
        let latest = items.pop_back();
        items.clear();
        latest
    }

    pub fn drain_all(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_drops_oldest_first() {
        let queue = DropOldestQueue::new(8);
        for tick in 0..12u64 {
            queue.push(tick);
        }
        assert_eq!(queue.len(), 8);
        assert_eq!(queue.dropped(), 4);
        assert_eq!(queue.drain_all(), (4..12).collect::<Vec<_>>());
    }

    #[test]
    fn drain_latest_returns_newest_and_empties() {
        let queue = DropOldestQueue::new(3);
        assert_eq!(queue.drain_latest(), None::<u32>);
        queue.push(1);
        queue.push(2);
        assert!(!queue.push(3));
        assert!(queue.push(4));
        assert_eq!(queue.drain_latest(), Some(4));
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let queue = DropOldestQueue::new(0);
        queue.push("a");
        queue.push("b");
        assert_eq!(queue.capacity(), 1);
        assert_eq!(queue.drain_all(), vec!["b"]);
    }
}
