//! Monitor-style blocking FIFO queue.
//!
//! A mutex paired with one condition variable guarding a `VecDeque`. This is
//! the coordination point between task submitters and pool workers: mutation
//! and notification happen under the same guard, so a waiter that holds the
//! lock cannot miss a wakeup for a mutation it has not yet observed.
//!
//! Locking is scoped: [`BlockingQueue::lock`] returns a [`QueueGuard`] and
//! dropping the guard unlocks. `wait`/`wait_for` release the lock, suspend
//! the calling thread until notified (or until the timeout elapses), and
//! reacquire the lock before returning. Spurious wakeups are possible, as
//! with any condition variable; callers re-check their predicate in a loop.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// FIFO queue with monitor semantics: one lock, one condition.
///
/// Insertion order is removal order regardless of which thread removes, so
/// task execution order equals submission order even with many workers.
pub struct BlockingQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Acquire the queue lock, blocking until it is available.
    pub fn lock(&self) -> QueueGuard<'_, T> {
        QueueGuard {
            items: self.items.lock().expect("queue mutex poisoned"),
            available: &self.available,
        }
    }

    /// Element count snapshot (takes the lock briefly).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped view of a locked [`BlockingQueue`]. Dropping the guard unlocks.
pub struct QueueGuard<'a, T> {
    items: MutexGuard<'a, VecDeque<T>>,
    available: &'a Condvar,
}

impl<'a, T> QueueGuard<'a, T> {
    /// Insert at the tail. O(1).
    pub fn append(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Remove and return the head, or `None` if empty. O(1).
    pub fn remove_first(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Wake one thread blocked in [`wait`](Self::wait) or
    /// [`wait_for`](Self::wait_for).
    pub fn notify_one(&self) {
        self.available.notify_one();
    }

    /// Wake every thread blocked in [`wait`](Self::wait) or
    /// [`wait_for`](Self::wait_for).
    pub fn notify_all(&self) {
        self.available.notify_all();
    }

    /// Release the lock and suspend until notified, then reacquire.
    pub fn wait(self) -> Self {
        let Self { items, available } = self;
        let items = available.wait(items).expect("queue mutex poisoned");
        Self { items, available }
    }

    /// Release the lock and suspend until notified or `timeout` elapses,
    /// then reacquire. The second return value is `true` when the wait
    /// timed out rather than being woken.
    pub fn wait_for(self, timeout: Duration) -> (Self, bool) {
        let Self { items, available } = self;
        let (items, result) = available
            .wait_timeout(items, timeout)
            .expect("queue mutex poisoned");
        (Self { items, available }, result.timed_out())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn fifo_order() {
        let queue = BlockingQueue::new();
        let mut guard = queue.lock();
        guard.append(1);
        guard.append(2);
        guard.append(3);
        assert_eq!(guard.len(), 3);

        assert_eq!(guard.remove_first(), Some(1));
        assert_eq!(guard.remove_first(), Some(2));
        assert_eq!(guard.remove_first(), Some(3));
        assert_eq!(guard.remove_first(), None);
        assert!(guard.is_empty());
    }

    #[test]
    fn remove_first_on_empty_returns_none() {
        let queue: BlockingQueue<u32> = BlockingQueue::new();
        assert_eq!(queue.lock().remove_first(), None);
    }

    #[test]
    fn len_without_guard() {
        let queue = BlockingQueue::new();
        assert!(queue.is_empty());
        queue.lock().append("a");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn wait_for_times_out_when_no_notify() {
        let queue: BlockingQueue<u32> = BlockingQueue::new();
        let guard = queue.lock();

        let start = Instant::now();
        let (guard, timed_out) = guard.wait_for(Duration::from_millis(20));
        drop(guard);

        assert!(timed_out);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn notify_wakes_waiter() {
        let queue: Arc<BlockingQueue<u32>> = Arc::new(BlockingQueue::new());
        let waiter_queue = Arc::clone(&queue);

        let waiter = thread::spawn(move || {
            let mut guard = waiter_queue.lock();
            loop {
                if let Some(item) = guard.remove_first() {
                    return item;
                }
                // Bounded wait so a lost wakeup cannot hang the test.
                let (reacquired, _) = guard.wait_for(Duration::from_secs(5));
                guard = reacquired;
            }
        });

        {
            let mut guard = queue.lock();
            guard.append(7);
            guard.notify_one();
        }

        assert_eq!(waiter.join().unwrap(), 7);
    }

    #[test]
    fn notify_all_wakes_every_waiter() {
        let queue: Arc<BlockingQueue<u32>> = Arc::new(BlockingQueue::new());
        let mut waiters = Vec::new();

        for _ in 0..3 {
            let q = Arc::clone(&queue);
            waiters.push(thread::spawn(move || {
                let mut guard = q.lock();
                loop {
                    if let Some(item) = guard.remove_first() {
                        return item;
                    }
                    let (reacquired, _) = guard.wait_for(Duration::from_secs(5));
                    guard = reacquired;
                }
            }));
        }

        {
            let mut guard = queue.lock();
            for i in 0..3 {
                guard.append(i);
            }
            guard.notify_all();
        }

        let mut received: Vec<u32> = waiters
            .into_iter()
            .map(|w| w.join().unwrap())
            .collect();
        received.sort_unstable();
        assert_eq!(received, vec![0, 1, 2]);
    }
}
