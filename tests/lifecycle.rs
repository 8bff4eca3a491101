//! End-to-end exercises of the public API: pool lifecycle under concurrent
//! submitters, ring handoff between threads, and the two composed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use taskpool_rs::{ring, PoolConfig, ThreadPool};

fn test_pool(workers: usize) -> ThreadPool {
    ThreadPool::new(PoolConfig {
        workers,
        name_prefix: "lifecycle-worker".to_string(),
        idle_wait: Duration::from_millis(50),
    })
}

#[test]
fn concurrent_submitters_all_drain() {
    const SUBMITTERS: usize = 4;
    const JOBS_EACH: usize = 50;

    let pool = Arc::new(test_pool(4));
    let completed = Arc::new(AtomicUsize::new(0));

    let mut submitters = Vec::new();
    for _ in 0..SUBMITTERS {
        let pool = Arc::clone(&pool);
        let completed = Arc::clone(&completed);
        submitters.push(thread::spawn(move || {
            for _ in 0..JOBS_EACH {
                let completed = Arc::clone(&completed);
                assert!(pool.execute(move || {
                    completed.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }));
    }
    for s in submitters {
        s.join().unwrap();
    }

    pool.shutdown();
    assert!(pool.await_termination(None));

    assert!(pool.is_terminated());
    assert_eq!(completed.load(Ordering::SeqCst), SUBMITTERS * JOBS_EACH);
    assert_eq!(
        pool.completed_task_count() as usize,
        SUBMITTERS * JOBS_EACH
    );
}

#[test]
fn submissions_refused_after_shutdown_under_contention() {
    let pool = Arc::new(test_pool(2));

    let submitter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let mut refused = 0u32;
            for _ in 0..1_000 {
                if !pool.execute(|| {}) {
                    refused += 1;
                }
            }
            refused
        })
    };

    thread::sleep(Duration::from_millis(5));
    pool.shutdown();

    let refused = submitter.join().unwrap();
    assert!(pool.await_termination(None));

    // Everything accepted was executed; everything refused was not queued.
    assert_eq!(
        pool.completed_task_count(),
        1_000 - u64::from(refused)
    );
    assert_eq!(pool.queue_depth(), 0);
}

#[test]
fn shutdown_now_on_idle_pool_returns_promptly() {
    let pool = ThreadPool::new(PoolConfig {
        workers: 2,
        name_prefix: "idle-worker".to_string(),
        // Long idle wait: prompt return must come from the explicit wakeup,
        // not from the timeout expiring.
        idle_wait: Duration::from_secs(5),
    });

    let start = Instant::now();
    let abandoned = pool.shutdown_now();
    assert!(abandoned.is_empty());
    assert!(pool.is_terminated());
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "idle workers were not woken for cancellation"
    );
}

#[test]
fn ring_hands_off_between_threads() {
    let (mut tx, mut rx) = ring::<u64>(16);
    const COUNT: u64 = 50_000;

    let producer = thread::spawn(move || {
        for i in 0..COUNT {
            loop {
                match tx.try_push(i) {
                    Ok(()) => break,
                    Err(_) => thread::yield_now(),
                }
            }
        }
    });

    let consumer = thread::spawn(move || {
        let mut sum = 0u64;
        let mut seen = 0u64;
        let mut expected_next = 0u64;
        while seen < COUNT {
            if let Some(v) = rx.try_pop() {
                assert_eq!(v, expected_next);
                expected_next += 1;
                sum += v;
                seen += 1;
            } else {
                thread::yield_now();
            }
        }
        sum
    });

    producer.join().unwrap();
    let sum = consumer.join().unwrap();
    assert_eq!(sum, COUNT * (COUNT - 1) / 2);
}

#[test]
fn pool_job_feeds_ring_consumer() {
    let (mut tx, mut rx) = ring::<u64>(8);
    const COUNT: u64 = 1_000;

    let pool = test_pool(2);
    assert!(pool.execute(move || {
        for i in 0..COUNT {
            loop {
                match tx.try_push(i * i) {
                    Ok(()) => break,
                    Err(_) => thread::yield_now(),
                }
            }
        }
    }));

    let mut received = Vec::with_capacity(COUNT as usize);
    while received.len() < COUNT as usize {
        if let Some(v) = rx.try_pop() {
            received.push(v);
        } else {
            thread::yield_now();
        }
    }

    pool.shutdown();
    assert!(pool.await_termination(None));

    for (i, &v) in received.iter().enumerate() {
        let i = i as u64;
        assert_eq!(v, i * i);
    }
}
