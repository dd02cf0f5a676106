//! Per-key debounced tasks on the tokio runtime.

use chronomark_core::TagFilterId;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Delay before a filter type toggle is saved.
pub const TOGGLE_FILTER_DEBOUNCE: Duration = Duration::from_millis(500);

/// Delay before a typed editor date is committed.
pub const INPUT_DEBOUNCE: Duration = Duration::from_millis(600);

/// Identity of a debounced operation. Scheduling under a key replaces any
/// pending work for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DebounceKey {
    ToggleFilterType(TagFilterId),
    StartTime,
    EndTime,
}

/// Runs the most recently scheduled closure per key once its delay elapses
/// without another schedule for that key.
///
/// Scheduling spawns onto the current tokio runtime and must happen inside
/// one. Dropping the debouncer aborts everything still pending.
#[derive(Debug)]
pub struct Debouncer<K = DebounceKey>
where
    K: Eq + Hash,
{
    timers: HashMap<K, JoinHandle<()>>,
}

impl<K: Eq + Hash> Default for Debouncer<K> {
    fn default() -> Self {
        Self {
            timers: HashMap::new(),
        }
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call<F>(&mut self, key: K, delay: Duration, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.timers.retain(|_, handle| !handle.is_finished());
        if let Some(previous) = self.timers.remove(&key) {
            trace!(?key, "Rescheduling debounced task");
            previous.abort();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        });
        self.timers.insert(key, handle);
    }

    pub fn cancel(&mut self, key: &K) {
        if let Some(handle) = self.timers.remove(key) {
            handle.abort();
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.timers
            .get(key)
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<K: Eq + Hash> Drop for Debouncer<K> {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let shared = Arc::clone(&count);
        let make = move || {
            let c = Arc::clone(&shared);
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }) as Box<dyn FnOnce() + Send>
        };
        (count, make)
    }

    async fn settle(duration: Duration) {
        tokio::time::sleep(duration).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let (count, make) = counter();
        let mut debouncer = Debouncer::new();
        debouncer.call(DebounceKey::StartTime, INPUT_DEBOUNCE, make());

        settle(Duration::from_millis(599)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending(&DebounceKey::StartTime));

        settle(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending(&DebounceKey::StartTime));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_within_delay_fires_once() {
        let (count, make) = counter();
        let mut debouncer = Debouncer::new();
        let key = DebounceKey::ToggleFilterType(TagFilterId::new("f"));

        for _ in 0..4 {
            debouncer.call(key.clone(), TOGGLE_FILTER_DEBOUNCE, make());
            settle(Duration::from_millis(300)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        settle(TOGGLE_FILTER_DEBOUNCE).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let (count, make) = counter();
        let mut debouncer = Debouncer::new();
        debouncer.call(DebounceKey::StartTime, INPUT_DEBOUNCE, make());
        debouncer.call(DebounceKey::EndTime, INPUT_DEBOUNCE, make());

        settle(Duration::from_millis(700)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_single_key() {
        let (count, make) = counter();
        let mut debouncer = Debouncer::new();
        debouncer.call(DebounceKey::StartTime, INPUT_DEBOUNCE, make());
        debouncer.call(DebounceKey::EndTime, INPUT_DEBOUNCE, make());
        debouncer.cancel(&DebounceKey::StartTime);

        settle(Duration::from_millis(700)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_fires_nothing() {
        let (count, make) = counter();
        let mut debouncer = Debouncer::new();
        debouncer.call(DebounceKey::StartTime, INPUT_DEBOUNCE, make());
        debouncer.call(DebounceKey::EndTime, INPUT_DEBOUNCE, make());
        debouncer.cancel_all();

        settle(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let (count, make) = counter();
        {
            let mut debouncer = Debouncer::new();
            debouncer.call(DebounceKey::StartTime, INPUT_DEBOUNCE, make());
        }
        settle(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
