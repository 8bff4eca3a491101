//! Fixed-size worker thread pool over a blocking FIFO queue.
//!
//! # Architecture
//!
//! ```text
//!   callers ──execute()──► BlockingQueue ◄──remove_first()── Worker 0..N-1
//!                              │                                  │
//!                              │ notify_one (per submit)          │ run job
//!                              │ notify_all (per completion)      ▼
//!                              ▼                          completed_tasks++
//!                    await_termination waiters
//! ```
//!
//! Workers are spawned and started by [`ThreadPool::new`]; no separate start
//! call exists. The queue is the single point of mutual exclusion between
//! workers and submitters. Execution order equals submission order (FIFO):
//! the queue has one insertion point and one removal point, even though the
//! dequeuing worker varies.
//!
//! # Lifecycle
//!
//! ```text
//!   Running ──shutdown()──► Terminating ──shutdown_now()──► Terminated
//! ```
//!
//! One monotonic state replaces independent `isShutdown`/`isTerminating`/
//! `isTerminated` flags, so contradictory combinations are unrepresentable.
//! Transitions happen under the pool lock and never revert; reads are plain
//! atomic loads.
//!
//! # Shutdown disciplines
//!
//! - **Graceful** ([`ThreadPool::shutdown`]): new submissions are refused,
//!   queued and in-flight jobs run to completion.
//! - **Immediate** ([`ThreadPool::shutdown_now`]): additionally cancels every
//!   worker, joins them, and hands back the jobs that were still queued.
//!   Cancellation is cooperative: each worker finishes at most one in-flight
//!   job before observing its flag and exiting.
//!
//! # Job failure policy
//!
//! A job that panics terminates only that execution: the panic is caught,
//! counted in [`ThreadPool::panicked_task_count`], and the worker moves on
//! to the next job. The pool never rethrows job panics.

mod worker;

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::queue::BlockingQueue;
use crate::trace::debug;

use worker::Worker;

/// A unit of work: run synchronously, exactly once, by exactly one worker.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

// Lifecycle states, ordered. Transitions are forward-only (`fetch_max`).
const RUNNING: u8 = 0;
const TERMINATING: u8 = 1;
const TERMINATED: u8 = 2;

/// Pool construction parameters.
///
/// | Parameter     | Default               | Rationale                          |
/// |---------------|-----------------------|------------------------------------|
/// | `workers`     | `num_cpus::get()`     | Match hardware parallelism         |
/// | `name_prefix` | `"pool-worker"`       | Thread names aid debugging         |
/// | `idle_wait`   | 1 s                   | Bound on cancellation latency when idle |
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of worker threads, fixed for the pool's lifetime.
    pub workers: usize,

    /// Worker thread names are `"{name_prefix}-{id}"`.
    pub name_prefix: String,

    /// Upper bound on how long an idle worker sleeps between re-checks of
    /// its cancellation flag. Larger values reduce idle wakeups; smaller
    /// values make `shutdown_now` on an idle pool more responsive (though
    /// it also wakes workers explicitly).
    pub idle_wait: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            name_prefix: "pool-worker".to_string(),
            idle_wait: Duration::from_secs(1),
        }
    }
}

impl PoolConfig {
    /// Default configuration with an explicit worker count.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    /// Validate configuration. Panics on invalid values.
    pub fn validate(&self) {
        assert!(self.workers > 0, "workers must be > 0");
        assert!(
            self.idle_wait > Duration::ZERO,
            "idle_wait must be non-zero"
        );
    }
}

/// State shared between the pool handle and its workers.
pub(crate) struct PoolShared {
    /// One of `RUNNING`/`TERMINATING`/`TERMINATED`. Written only under the
    /// pool lock, read without it.
    lifecycle: AtomicU8,

    /// Jobs dequeued so far. Incremented when a worker removes a job from
    /// the queue, before running it, so the counter includes jobs that
    /// subsequently panic.
    completed_tasks: AtomicU64,

    /// Jobs whose execution panicked.
    panicked_tasks: AtomicU64,

    /// Workers currently executing a job.
    active_workers: AtomicUsize,

    /// Bounded idle wait for the worker loop.
    idle_wait: Duration,
}

impl PoolShared {
    fn new(idle_wait: Duration) -> Self {
        Self {
            lifecycle: AtomicU8::new(RUNNING),
            completed_tasks: AtomicU64::new(0),
            panicked_tasks: AtomicU64::new(0),
            active_workers: AtomicUsize::new(0),
            idle_wait,
        }
    }

    fn is_shutdown(&self) -> bool {
        self.lifecycle.load(Ordering::Acquire) >= TERMINATING
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.lifecycle.load(Ordering::Acquire) == TERMINATED
    }

    /// Forward-only state transition.
    fn advance(&self, to: u8) {
        self.lifecycle.fetch_max(to, Ordering::AcqRel);
    }
}

/// Fixed-size worker thread pool.
///
/// All workers are spawned and running before [`ThreadPool::new`] returns.
/// Dropping the pool forces the [`shutdown_now`](Self::shutdown_now)
/// equivalent first if termination has not already happened, so no worker
/// thread ever outlives the pool.
pub struct ThreadPool {
    queue: Arc<BlockingQueue<Job>>,
    shared: Arc<PoolShared>,

    /// Pool lock: serializes lifecycle transitions and the submission-side
    /// lifecycle check.
    state_lock: Mutex<()>,

    /// Worker handles, locked separately from `state_lock` so submitters
    /// never wait behind a join in progress.
    workers: Mutex<Vec<Worker>>,

    pool_size: usize,
}

impl ThreadPool {
    /// Create a pool and start all of its workers.
    ///
    /// # Panics
    ///
    /// If the configuration is invalid ([`PoolConfig::validate`]) or a
    /// worker thread cannot be spawned.
    pub fn new(config: PoolConfig) -> Self {
        config.validate();

        let queue = Arc::new(BlockingQueue::new());
        let shared = Arc::new(PoolShared::new(config.idle_wait));

        let mut workers = Vec::with_capacity(config.workers);
        for id in 0..config.workers {
            workers.push(Worker::spawn(
                id,
                &config.name_prefix,
                Arc::clone(&queue),
                Arc::clone(&shared),
            ));
        }

        debug!(workers = config.workers, "pool started");

        Self {
            queue,
            shared,
            state_lock: Mutex::new(()),
            workers: Mutex::new(workers),
            pool_size: config.workers,
        }
    }

    /// Create a pool of `workers` threads with default settings.
    pub fn with_size(workers: usize) -> Self {
        Self::new(PoolConfig::with_workers(workers))
    }

    /// Submit a job. Returns `false` without enqueueing if shutdown has been
    /// requested; otherwise appends the job, wakes one idle worker, and
    /// returns `true`.
    ///
    /// The lifecycle check and the enqueue run under different locks with a
    /// window between them: a `shutdown()` that lands in the window lets one
    /// already-checked job slip into the queue. Such a job is either drained
    /// by a worker (graceful shutdown) or handed back by `shutdown_now`;
    /// closing the window would serialize every submission against lifecycle
    /// changes, so it is documented instead.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) -> bool {
        {
            let _state = self.state_lock.lock().expect("pool mutex poisoned");
            if self.shared.is_shutdown() {
                return false;
            }
        }

        let mut guard = self.queue.lock();
        guard.append(Box::new(job));
        guard.notify_one();
        true
    }

    /// Graceful shutdown: stop accepting submissions; queued and in-flight
    /// jobs keep running. Idempotent.
    pub fn shutdown(&self) {
        let _state = self.state_lock.lock().expect("pool mutex poisoned");
        self.shared.advance(TERMINATING);
        debug!("shutdown requested");
    }

    /// Immediate shutdown: refuse new submissions, cancel every worker, wake
    /// all threads blocked on the queue, join every worker, and return the
    /// jobs that were still queued (abandoned, never executed).
    ///
    /// Blocks until all workers have exited; each worker finishes at most
    /// one in-flight job first, so the bound is task-completion time, not
    /// queue depth. Idempotent: later calls join nothing and return whatever
    /// is still queued (normally nothing).
    pub fn shutdown_now(&self) -> Vec<Job> {
        self.shutdown();

        let mut workers = self.workers.lock().expect("pool mutex poisoned");
        for w in workers.iter() {
            w.cancel();
        }

        // Wake everything blocked on the queue so cancellation is observed
        // now rather than at the next idle-wait timeout.
        self.queue.lock().notify_all();

        for w in workers.iter_mut() {
            w.join();
        }
        drop(workers);

        {
            let _state = self.state_lock.lock().expect("pool mutex poisoned");
            self.shared.advance(TERMINATED);
        }

        let mut guard = self.queue.lock();
        let mut abandoned = Vec::with_capacity(guard.len());
        while let Some(job) = guard.remove_first() {
            abandoned.push(job);
        }
        // Termination waiters may still be blocked on a queue they saw as
        // non-empty; the drain above just emptied it.
        guard.notify_all();
        drop(guard);

        debug!(abandoned = abandoned.len(), "pool terminated");
        abandoned
    }

    /// Block until the queue drains or `timeout` elapses, then force
    /// termination via [`shutdown_now`](Self::shutdown_now).
    ///
    /// Returns `false` immediately if no shutdown has been requested yet.
    /// Otherwise returns whether the queue emptied before the deadline.
    /// `None` waits indefinitely for the drain. Either way the pool is
    /// terminated when this returns.
    pub fn await_termination(&self, timeout: Option<Duration>) -> bool {
        if !self.is_terminating() {
            return false;
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        let drained;
        {
            let mut guard = self.queue.lock();
            loop {
                if guard.is_empty() {
                    drained = true;
                    break;
                }
                match deadline {
                    None => guard = guard.wait(),
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            drained = false;
                            break;
                        }
                        let (reacquired, _) = guard.wait_for(deadline - now);
                        guard = reacquired;
                    }
                }
            }
        }

        self.shutdown_now();
        drained
    }

    /// Number of worker threads, fixed at creation.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Workers currently executing a job. Snapshot; may be stale by the
    /// time the caller inspects it.
    pub fn active_count(&self) -> usize {
        self.shared.active_workers.load(Ordering::Relaxed)
    }

    /// Jobs dequeued so far.
    ///
    /// This counts dequeues, not successful completions: the counter is
    /// incremented when a worker removes a job from the queue, before the
    /// job runs, so jobs that panic are included. Callers that need
    /// "finished without panicking" should subtract
    /// [`panicked_task_count`](Self::panicked_task_count).
    pub fn completed_task_count(&self) -> u64 {
        self.shared.completed_tasks.load(Ordering::Relaxed)
    }

    /// Jobs whose execution panicked.
    pub fn panicked_task_count(&self) -> u64 {
        self.shared.panicked_tasks.load(Ordering::Relaxed)
    }

    /// Whether shutdown (graceful or immediate) has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shared.is_shutdown()
    }

    /// Whether shutdown has been initiated. Identical to
    /// [`is_shutdown`](Self::is_shutdown): the two conditions are set
    /// together and only differ in name for callers used to executor-style
    /// introspection.
    pub fn is_terminating(&self) -> bool {
        self.shared.is_shutdown()
    }

    /// Whether all workers have exited and been joined.
    pub fn is_terminated(&self) -> bool {
        self.shared.is_terminated()
    }

    /// The underlying queue, for inspection.
    pub fn queue(&self) -> &BlockingQueue<Job> {
        &self.queue
    }

    /// Jobs currently queued (snapshot).
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.is_terminated() {
            let _ = self.shutdown_now();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
