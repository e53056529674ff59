mod common;

use pledge::{PoolBuilder, Status, task};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

fn thread_name() -> String {
    thread::current().name().unwrap_or_default().to_string()
}

#[test]
fn test_single_worker_thread() {
    common::init_tracing();
    let pool = PoolBuilder::new().worker_threads(1).build();

    assert_eq!(pool.spawn(|| 42).result().unwrap(), 42);
}

#[test]
#[should_panic(expected = "worker_threads must be > 0")]
fn test_zero_worker_threads_panics() {
    let _ = PoolBuilder::new().worker_threads(0);
}

#[test]
fn test_worker_threads_parallel_execution() {
    common::init_tracing();
    let pool = PoolBuilder::new().worker_threads(4).build();
    let counter = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let counter = counter.clone();

            pool.spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                i * 2
            })
        })
        .collect();

    let sum: usize = tasks.iter().map(|t| t.result().unwrap()).sum();

    assert_eq!(counter.load(Ordering::SeqCst), 100);
    assert_eq!(sum, (0..100).map(|i| i * 2).sum::<usize>());
}

#[test]
fn test_workers_are_named_after_the_pool() {
    let pool = PoolBuilder::new()
        .worker_threads(2)
        .thread_name("calc")
        .build();

    let name = pool.spawn(thread_name).result().unwrap();
    assert!(name.starts_with("calc-worker-"), "{name}");
}

#[test]
fn test_spawn_dedicated_uses_its_own_thread() {
    let pool = PoolBuilder::new()
        .worker_threads(1)
        .thread_name("calc")
        .build();

    let name = pool.spawn_dedicated(thread_name).result().unwrap();
    assert!(name.starts_with("calc-dedicated-"), "{name}");
}

#[test]
fn test_spawn_from_worker_stays_on_pool() {
    let pool = PoolBuilder::new()
        .worker_threads(2)
        .thread_name("nested")
        .build();

    let inner = pool.spawn(|| task::spawn(thread_name)).result().unwrap();
    let name = inner.result().unwrap();

    assert!(name.starts_with("nested-worker-"), "{name}");
}

#[test]
fn test_spawn_outside_pool_uses_default_pool() {
    let name = task::spawn(thread_name).result().unwrap();

    assert!(name.starts_with("pledge-worker-"), "{name}");
}

#[test]
fn test_block_on_makes_pool_current() {
    let pool = PoolBuilder::new()
        .worker_threads(1)
        .thread_name("blocking")
        .build();

    let name = pool
        .block_on(async { task::spawn(thread_name).await })
        .unwrap();

    assert!(name.starts_with("blocking-worker-"), "{name}");
}

#[test]
fn test_shutdown_drains_queued_work() {
    let pool = PoolBuilder::new().worker_threads(1).build();
    let counter = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let counter = counter.clone();

            pool.spawn(move || {
                thread::sleep(Duration::from_millis(1));
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    pool.shutdown();

    assert_eq!(counter.load(Ordering::SeqCst), 20);
    assert!(tasks.iter().all(|t| t.status() == Status::RanToCompletion));
}

#[test]
fn test_spawn_after_shutdown_is_canceled() {
    common::init_tracing();
    let pool = PoolBuilder::new().worker_threads(1).build();
    let handle = pool.handle().clone();

    pool.shutdown();
    assert!(handle.is_shutdown());

    let task = handle.spawn(|| 1);

    assert!(task.is_canceled());
    assert!(task.wait().unwrap_err().is_canceled());
}
