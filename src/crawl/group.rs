// src/crawl/group.rs
// =============================================================================
// BoundedGroup: a join group with a fixed number of concurrency slots.
//
// It combines two things:
// - a semaphore, so at most `limit` units of work are registered at once
// - a pending counter, so `wait_all()` can block until every unit is done
//
// Every branch point of the crawl creates its own group. The limit is a
// per-branch cap, not a global one: with limit 1 each branch works one child
// at a time, and the real parallelism comes from sibling branches running
// side by side.
//
// Rust concepts:
// - Arc: shared ownership between the group and the spawned tasks
// - Drop: a Slot gives its unit back even if the task panics
// =============================================================================

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

#[derive(Debug)]
struct Inner {
    limit: usize,
    slots: Arc<Semaphore>,
    pending: AtomicUsize,
    all_done: Notify,
}

#[derive(Debug, Clone)]
pub struct BoundedGroup {
    inner: Arc<Inner>,
}

impl BoundedGroup {
    // Creates a group with `limit` slots
    //
    // Panics if limit is 0: such a group could never run anything.
    pub fn new(limit: usize) -> Self {
        assert!(limit > 0, "BoundedGroup limit must be at least 1");
        Self {
            inner: Arc::new(Inner {
                limit,
                slots: Arc::new(Semaphore::new(limit)),
                pending: AtomicUsize::new(0),
                all_done: Notify::new(),
            }),
        }
    }

    #[cfg(test)]
    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    // Reserves `n` slots, waiting until all of them are free
    //
    // Asking for more than `limit` slots can never succeed, so it is treated
    // as a programming error and panics instead of waiting forever.
    pub async fn register(&self, n: usize) {
        assert!(
            n <= self.inner.limit,
            "cannot register {} units in a group limited to {}",
            n,
            self.inner.limit
        );
        if n == 0 {
            return;
        }

        // The semaphore is owned by the group and never closed
        let permits = self
            .inner
            .slots
            .acquire_many(n as u32)
            .await
            .expect("group semaphore closed");
        // Count the units only once the slots are ours, so a cancelled
        // register() leaves nothing behind
        permits.forget();
        self.inner.pending.fetch_add(n, Ordering::SeqCst);
    }

    // Returns one slot and marks one unit of work as finished
    pub fn release(&self) {
        self.inner.slots.add_permits(1);
        let before = self.inner.pending.fetch_sub(1, Ordering::SeqCst);
        assert!(before > 0, "release() called more times than registered");
        if before == 1 {
            self.inner.all_done.notify_waiters();
        }
    }

    // Waits until every registered unit has been released
    pub async fn wait_all(&self) {
        loop {
            // Create the waiter before checking, so a release in between
            // cannot be missed
            let notified = self.inner.all_done.notified();
            if self.inner.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Units registered and not yet released
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Slots currently held
    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.inner.limit - self.inner.slots.available_permits()
    }

    // Registers one unit, then runs `task` on the tokio runtime
    //
    // The slot is released when the task finishes, whichever way it finishes.
    pub async fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.register(1).await;
        let slot = Slot {
            group: self.clone(),
        };
        tokio::spawn(async move {
            let _slot = slot;
            task.await;
        });
    }
}

// Releases one unit of its group when dropped
struct Slot {
    group: BoundedGroup,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.group.release();
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why forget() the permits?
//    - register() and release() are separate calls, possibly on different
//      tasks, so there is no permit value to carry between them
//    - forget() keeps the slots taken; add_permits(1) hands one back
//
// 2. Why a Notify plus a counter instead of a JoinSet?
//    - Units can be registered by register() directly, not only via spawn()
//    - The counter is the truth; Notify only wakes waiters to re-check it
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_all_on_empty_group_returns() {
        let group = BoundedGroup::new(3);
        group.wait_all().await;
        assert_eq!(group.pending(), 0);
    }

    #[tokio::test]
    async fn test_register_and_release() {
        let group = BoundedGroup::new(2);
        group.register(2).await;
        assert_eq!(group.in_flight(), 2);
        assert_eq!(group.pending(), 2);
        group.release();
        group.release();
        assert_eq!(group.in_flight(), 0);
        group.wait_all().await;
    }

    #[tokio::test]
    #[should_panic(expected = "cannot register 3 units")]
    async fn test_register_more_than_limit_panics() {
        let group = BoundedGroup::new(2);
        group.register(3).await;
    }

    #[test]
    #[should_panic]
    fn test_zero_limit_panics() {
        BoundedGroup::new(0);
    }

    #[tokio::test]
    async fn test_register_blocks_until_slot_is_free() {
        let group = BoundedGroup::new(1);
        group.register(1).await;

        let waiting = tokio::time::timeout(Duration::from_millis(50), group.register(1)).await;
        assert!(waiting.is_err(), "second register should wait for a free slot");

        group.release();
        tokio::time::timeout(Duration::from_millis(500), group.register(1))
            .await
            .expect("slot should be free after release");
        group.release();
        group.wait_all().await;
    }

    #[tokio::test]
    async fn test_spawn_never_exceeds_limit() {
        let group = BoundedGroup::new(3);
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let live = live.clone();
            let peak = peak.clone();
            let finished = finished.clone();
            let probe = group.clone();
            group
                .spawn(async move {
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    assert!(probe.in_flight() <= probe.limit());
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    live.fetch_sub(1, Ordering::SeqCst);
                    finished.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }
        group.wait_all().await;

        assert_eq!(finished.load(Ordering::SeqCst), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(group.pending(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_still_releases() {
        let group = BoundedGroup::new(1);
        group.spawn(async { panic!("boom") }).await;
        tokio::time::timeout(Duration::from_secs(1), group.wait_all())
            .await
            .expect("a panicked task must still release its slot");
    }
}
