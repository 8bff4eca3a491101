//! Worker thread: one OS thread running the dequeue-and-run loop.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::queue::BlockingQueue;
use crate::trace::{error, trace};

use super::{Job, PoolShared};

/// Handle to one worker: the thread plus its cooperative cancellation flag.
///
/// Cancellation is observed at the top of the loop and after each bounded
/// wait; there is no preemptive interruption, so a job already running
/// completes before the worker exits.
pub(crate) struct Worker {
    /// Worker index, read only by the trace events in `join`.
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    id: usize,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn a named worker thread running [`worker_loop`] against the
    /// shared queue and pool state. The thread starts immediately.
    pub(crate) fn spawn(
        id: usize,
        name_prefix: &str,
        queue: Arc<BlockingQueue<Job>>,
        shared: Arc<PoolShared>,
    ) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let handle = std::thread::Builder::new()
            .name(format!("{name_prefix}-{id}"))
            .spawn(move || worker_loop(id, &queue, &shared, &flag))
            .expect("failed to spawn worker thread");

        Self {
            id,
            cancel,
            handle: Some(handle),
        }
    }

    /// Request cooperative cancellation.
    pub(crate) fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Join the worker thread. Idempotent: joining an already-joined worker
    /// is a no-op.
    ///
    /// Job panics are caught inside the loop, so a panicking thread here
    /// indicates an internal bug; it is recorded and the join still
    /// completes rather than propagating into pool teardown.
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(worker = self.id, "worker thread panicked outside a job");
            }
        }
    }
}

/// The per-worker loop.
///
/// Runs while neither the worker's cancellation flag nor pool termination
/// has been observed:
///
/// 1. Lock the queue and try to remove the head.
/// 2. On a job: count the dequeue, unlock, run the job to completion under
///    a panic boundary, then re-lock and `notify_all` so threads blocked in
///    `await_termination` observe the queue-size change.
/// 3. On an empty queue: block in a bounded wait so cancellation and
///    termination are re-evaluated periodically even without a wakeup.
// `id` feeds the trace events, which compile away without the feature.
#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn worker_loop(
    id: usize,
    queue: &BlockingQueue<Job>,
    shared: &PoolShared,
    cancel: &AtomicBool,
) {
    trace!(worker = id, "worker started");

    while !cancel.load(Ordering::Acquire) && !shared.is_terminated() {
        let mut guard = queue.lock();
        match guard.remove_first() {
            Some(job) => {
                // Counts dequeues, not successful completions; see
                // `ThreadPool::completed_task_count`.
                shared.completed_tasks.fetch_add(1, Ordering::Relaxed);
                drop(guard);

                shared.active_workers.fetch_add(1, Ordering::Relaxed);
                let outcome = catch_unwind(AssertUnwindSafe(job));
                shared.active_workers.fetch_sub(1, Ordering::Relaxed);

                if outcome.is_err() {
                    shared.panicked_tasks.fetch_add(1, Ordering::Relaxed);
                    error!(worker = id, "job panicked; worker continues");
                }

                let guard = queue.lock();
                guard.notify_all();
            }
            None => {
                let (guard, _timed_out) = guard.wait_for(shared.idle_wait);
                drop(guard);
            }
        }
    }

    trace!(worker = id, "worker exiting");
}
