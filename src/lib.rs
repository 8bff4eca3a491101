//! Low-level concurrency toolkit: a bounded lock-free SPSC ring buffer and a
//! fixed-size worker thread pool.
//!
//! ## Scope
//! This crate is the execution substrate for protocol code layered above it.
//! It provides exactly two things and keeps both small:
//!
//! - [`spsc`]: a power-of-two-capacity ring buffer synchronizing exactly one
//!   producer thread and one consumer thread without locks, for the
//!   lowest-latency handoff between two fixed parties.
//! - [`pool`]: a fixed set of worker threads draining a monitor-guarded FIFO
//!   queue, with graceful and immediate shutdown disciplines and cooperative
//!   cancellation.
//!
//! ## Key invariants
//! - The ring delivers items in FIFO order exactly once, provided there is
//!   exactly one producer and one consumer; the handle pair makes a third
//!   owner unrepresentable.
//! - Ring operations never block; full and empty are reported by return
//!   value, never by waiting or panicking.
//! - Pool task execution order equals submission order. Lifecycle state only
//!   moves forward: Running, then Terminating, then Terminated.
//! - Cancellation is cooperative: a running job is never interrupted, and
//!   immediate shutdown waits for at most one in-flight job per worker.
//!
//! ## Notable entry points
//! - [`spsc::ring`] / [`spsc::ring_with_drain`]: build a producer/consumer
//!   handle pair.
//! - [`ThreadPool::new`] / [`ThreadPool::with_size`]: start a pool.
//! - [`BlockingQueue`]: the monitor-style FIFO the pool coordinates on,
//!   usable on its own.
//!
//! ## Design trade-offs
//! The ring trades generality for latency: restricting it to two owners is
//! what lets each index be written by a single thread and synchronized with
//! plain acquire/release loads and stores instead of compare-and-swap. The
//! pool trades preemption for simplicity: shutdown latency is bounded by the
//! longest-running job, never by queue depth.

pub mod pool;
pub mod queue;
pub mod spsc;
pub mod trace;

pub use pool::{Job, PoolConfig, ThreadPool};
pub use queue::{BlockingQueue, QueueGuard};
pub use spsc::{ring, ring_with_drain, RingConsumer, RingProducer};
