//! Lock-free SPSC (Single-Producer, Single-Consumer) bounded ring buffer.
//!
//! # Design
//!
//! A fixed-capacity circular array shared between exactly one producer and
//! one consumer thread. `elements` must be a power of two; one slot is always
//! kept empty so full and empty are distinguishable from the indices alone,
//! giving a usable capacity of `elements - 1`.
//!
//! # Key properties
//!
//! - **Non-blocking**: `try_push` and `try_pop` complete in bounded steps and
//!   report full/empty by returning the item / `None` instead of waiting.
//! - **No CAS**: each index is written by exactly one side, so plain
//!   `Acquire`/`Release` loads and stores suffice. On x86-64 TSO these
//!   compile to plain `MOV`.
//! - **Cached remote index**: the producer caches the consumer's `head` and
//!   only reloads on apparent-full; the consumer caches the producer's `tail`
//!   and only reloads on apparent-empty. This reduces cache-coherence traffic.
//! - **Cache-line padded**: the two indices live on separate cache lines so
//!   the producer and consumer never false-share.
//! - **Power-of-2 capacity**: slot index is `counter & mask`. Any `u32` power
//!   of two divides 2^32, so the monotonic counters may wrap freely.
//! - **Two owners only**: construction returns exactly one [`RingProducer`]
//!   and one [`RingConsumer`]; neither is `Clone`. The ring performs no
//!   locking to protect its own lifetime, so the two-owner restriction is
//!   enforced at the type level rather than documented and hoped for.
//!
//! # Teardown
//!
//! When the second handle drops, items still buffered are passed in FIFO
//! order to the drain callback given to [`ring_with_drain`], or dropped in
//! place when the ring was built with [`ring`].
//!
//! # Ordering rationale
//!
//! ```text
//! Producer writes slot, then Release-stores tail  →  consumer Acquire-loads tail, then reads slot
//! Consumer reads slot, then Release-stores head   →  producer Acquire-loads head, then writes slot
//! ```
//!
//! This establishes happens-before between slot write and slot read in both
//! directions.
//!
//! # Safety
//!
//! Uses `unsafe` for `MaybeUninit` slot access through `UnsafeCell`.
//! Invariants are documented per operation. Run under Miri and loom to
//! validate.

#[cfg(not(loom))]
use std::sync::atomic::{AtomicU32, Ordering};
#[cfg(not(loom))]
use std::sync::Arc;

#[cfg(loom)]
use loom::sync::atomic::{AtomicU32, Ordering};
#[cfg(loom)]
use loom::sync::Arc;

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

use crossbeam_utils::CachePadded;

/// Per-item teardown callback, invoked once for each item still buffered
/// when the ring is destroyed.
type DrainFn<T> = Box<dyn FnMut(T) + Send>;

/// Shared storage backing the ring.
///
/// # Invariants
///
/// - `slots.len()` is a power of two; `mask == slots.len() - 1`.
/// - `head` and `tail` are monotonically increasing; the slot for counter
///   value `c` is `c & mask`. They satisfy `0 <= tail - head <= mask`
///   (usable capacity is one less than the slot count).
/// - Slots in the logical range `[head, tail)` are initialized; all other
///   slots are uninitialized.
/// - Only the producer writes `tail` and reads `head`; only the consumer
///   writes `head` and reads `tail`.
struct RingShared<T> {
    /// Slot storage. Wrapped in `UnsafeCell` because producer writes and
    /// consumer reads different slots concurrently; the atomic indices with
    /// Release/Acquire ordering provide the synchronization barrier.
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,

    /// `slots.len() - 1`; also the usable capacity.
    mask: u32,

    /// Consumer's read index. Only the consumer advances this (Release
    /// store); the producer reads it (Acquire load) to detect space.
    head: CachePadded<AtomicU32>,

    /// Producer's write index. Only the producer advances this (Release
    /// store); the consumer reads it (Acquire load) to detect data.
    tail: CachePadded<AtomicU32>,

    /// Teardown callback for items never retrieved. Touched only during
    /// construction and in `drop` (exclusive access both times).
    drain: Option<DrainFn<T>>,
}

// SAFETY: The SPSC protocol ensures the producer and consumer access
// disjoint slots, synchronized through the atomic indices. `drain` is only
// used under exclusive access (construction and drop).
unsafe impl<T: Send> Sync for RingShared<T> {}
unsafe impl<T: Send> Send for RingShared<T> {}

impl<T> RingShared<T> {
    fn with_elements(elements: u32, drain: Option<DrainFn<T>>) -> Self {
        assert!(
            elements.is_power_of_two(),
            "ring size must be a power of two, got {elements}"
        );

        let slots = (0..elements)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();

        Self {
            slots,
            mask: elements - 1,
            head: CachePadded::new(AtomicU32::new(0)),
            tail: CachePadded::new(AtomicU32::new(0)),
            drain,
        }
    }

    /// Free slots as of the instant of the call. Advisory only: the other
    /// party may change it immediately after the loads.
    fn remaining(&self) -> u32 {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        self.mask - (tail.wrapping_sub(head) & self.mask)
    }
}

impl<T> Drop for RingShared<T> {
    fn drop(&mut self) {
        // Both handles are gone; this is the only remaining access.
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        let mut drain = self.drain.take();

        let mut idx = head;
        while idx != tail {
            let slot = (idx & self.mask) as usize;
            // SAFETY: slots in [head, tail) are initialized, and we read
            // each exactly once before the storage is freed.
            let item = unsafe { (*self.slots[slot].get()).assume_init_read() };
            match drain.as_mut() {
                Some(f) => f(item),
                None => drop(item),
            }
            idx = idx.wrapping_add(1);
        }
    }
}

/// Producer handle: the writing half of the ring.
///
/// Not `Clone`. Can be moved to another thread; `try_push` takes `&mut self`
/// so at most one thread produces at a time.
pub struct RingProducer<T> {
    ring: Arc<RingShared<T>>,
    /// Cached snapshot of the consumer's `head`. Refreshed only when the
    /// ring appears full, so the common-case push never loads the consumer's
    /// cache line.
    cached_head: u32,
}

impl<T> RingProducer<T> {
    /// Attempt to push `value`, returning `Err(value)` without mutating the
    /// ring if it is full.
    ///
    /// Full means the slot behind the consumer's read position is the next
    /// write target, i.e. `(tail + 1) & mask == head & mask`; with the
    /// monotonic counters that is exactly `tail - head == mask`.
    ///
    /// # Ordering
    ///
    /// 1. Read `tail` (Relaxed; we are the only writer).
    /// 2. If apparently full against the cached head, reload `head` with
    ///    Acquire and re-check.
    /// 3. Write the slot at `tail & mask`.
    /// 4. Release-store `tail + 1`, publishing the slot to the consumer.
    #[inline]
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        let tail = self.ring.tail.load(Ordering::Relaxed);

        if tail.wrapping_sub(self.cached_head) >= self.ring.mask {
            self.cached_head = self.ring.head.load(Ordering::Acquire);
            if tail.wrapping_sub(self.cached_head) >= self.ring.mask {
                return Err(value);
            }
        }

        let slot = (tail & self.ring.mask) as usize;
        // SAFETY: tail - head < mask, so this slot is outside [head, tail)
        // and the consumer will not touch it until we advance tail below.
        unsafe {
            self.ring.slots[slot].get().write(MaybeUninit::new(value));
        }

        self.ring
            .tail
            .store(tail.wrapping_add(1), Ordering::Release);

        Ok(())
    }

    /// Free slots as of the instant of the call; see [`RingConsumer::remaining`].
    pub fn remaining(&self) -> u32 {
        self.ring.remaining()
    }

    /// Usable capacity: one less than the slot count.
    pub fn capacity(&self) -> u32 {
        self.ring.mask
    }
}

/// Consumer handle: the reading half of the ring.
///
/// Not `Clone`. Can be moved to another thread; `try_pop` takes `&mut self`
/// so at most one thread consumes at a time.
pub struct RingConsumer<T> {
    ring: Arc<RingShared<T>>,
    /// Cached snapshot of the producer's `tail`. Refreshed only when the
    /// ring appears empty, so the common-case pop never loads the producer's
    /// cache line.
    cached_tail: u32,
}

impl<T> RingConsumer<T> {
    /// Attempt to pop the oldest item, returning `None` without mutating the
    /// ring if it is empty (`head == tail`).
    ///
    /// # Ordering
    ///
    /// 1. Read `head` (Relaxed; we are the only writer).
    /// 2. If apparently empty against the cached tail, reload `tail` with
    ///    Acquire and re-check.
    /// 3. Read the slot at `head & mask`.
    /// 4. Release-store `head + 1`, freeing the slot for the producer.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let head = self.ring.head.load(Ordering::Relaxed);

        if head == self.cached_tail {
            self.cached_tail = self.ring.tail.load(Ordering::Acquire);
            if head == self.cached_tail {
                return None;
            }
        }

        let slot = (head & self.ring.mask) as usize;
        // SAFETY: head != tail, so this slot is inside [head, tail) and was
        // initialized by the producer; the producer will not overwrite it
        // until we advance head below.
        let value = unsafe { (*self.ring.slots[slot].get()).assume_init_read() };

        self.ring
            .head
            .store(head.wrapping_add(1), Ordering::Release);

        Some(value)
    }

    /// Free slots as of the instant of the call. Advisory only: a snapshot,
    /// not a reservation; the producer may fill the space before the caller
    /// acts on it.
    pub fn remaining(&self) -> u32 {
        self.ring.remaining()
    }

    /// Usable capacity: one less than the slot count.
    pub fn capacity(&self) -> u32 {
        self.ring.mask
    }
}

/// Create a ring with `elements` slots (`elements - 1` usable).
///
/// `elements` must be a power of two; violating this is a construction-time
/// precondition failure (panic).
///
/// Returns the producer and consumer handles. Each may be sent to a
/// different thread; the shared storage is reclaimed when both are dropped,
/// dropping any items never retrieved.
///
/// # Example
///
/// ```
/// let (mut tx, mut rx) = taskpool_rs::spsc::ring::<u64>(8);
/// tx.try_push(42).unwrap();
/// assert_eq!(rx.try_pop(), Some(42));
/// ```
pub fn ring<T: Send>(elements: u32) -> (RingProducer<T>, RingConsumer<T>) {
    build(RingShared::with_elements(elements, None))
}

/// Like [`ring`], with a teardown callback invoked once per item still
/// buffered when the second handle drops, in FIFO order.
pub fn ring_with_drain<T: Send>(
    elements: u32,
    drain: impl FnMut(T) + Send + 'static,
) -> (RingProducer<T>, RingConsumer<T>) {
    build(RingShared::with_elements(elements, Some(Box::new(drain))))
}

fn build<T: Send>(shared: RingShared<T>) -> (RingProducer<T>, RingConsumer<T>) {
    let ring = Arc::new(shared);
    let producer = RingProducer {
        ring: Arc::clone(&ring),
        cached_head: 0,
    };
    let consumer = RingConsumer {
        ring,
        cached_tail: 0,
    };
    (producer, consumer)
}

// ============================================================================
// Tests
// ============================================================================


// ============================================================================
// Property Tests
// ============================================================================


// ============================================================================
// Loom Tests
// ============================================================================
