//! Tests for LockedBuddyPool shared between threads

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use buddy_pool::{AllocError, LockedBuddyPool, PoolConfig};

const THREADS: usize = 4;
const ROUNDS: usize = 200;

#[test]
fn test_concurrent_drivers_keep_invariants() {
    let pool = Arc::new(LockedBuddyPool::new(PoolConfig::new(1 << 16, 64).unwrap()));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let name = format!("t{}-{}", t, round);
                    let size = 64 << (round % 5);
                    match pool.allocate(&name, size) {
                        Ok(handle) => assert!(handle.size_bytes >= size),
                        Err(e) => assert_eq!(e, AllocError::OutOfMemory),
                    }
                    if round % 3 == 0 {
                        let _ = pool.deallocate(&name);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(pool.lock().check_invariants(), Ok(()));

    for info in pool.processes() {
        let name = info.name().unwrap().to_string();
        pool.deallocate(&name).unwrap();
    }
    let snapshot = pool.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot[0].is_free());
    assert_eq!(pool.available_bytes(), 1 << 16);
}

#[test]
fn test_name_race_has_one_winner() {
    let pool = Arc::new(LockedBuddyPool::default());

    let winners: usize = (0..THREADS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.allocate("shared", 64).is_ok())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap() as usize)
        .sum();

    assert_eq!(winners, 1);
    assert_eq!(pool.processes().len(), 1);
}

#[test]
fn test_lock_is_exclusive() {
    let pool = Arc::new(LockedBuddyPool::default());
    let inside = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let inside = Arc::clone(&inside);
            let overlaps = Arc::clone(&overlaps);
            thread::spawn(move || {
                for _ in 0..2000 {
                    let guard = pool.lock();
                    if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    std::hint::spin_loop();
                    inside.fetch_sub(1, Ordering::SeqCst);
                    drop(guard);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[test]
fn test_guard_holds_for_compound_operation() {
    let pool = Arc::new(LockedBuddyPool::new(PoolConfig::new(1 << 12, 64).unwrap()));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let name = format!("t{}-{}", t, round);
                    let mut guard = pool.lock();
                    let before = guard.process_count();
                    guard.allocate(&name, 64).unwrap();
                    assert_eq!(guard.process_count(), before + 1);
                    assert_eq!(guard.query(&name).and_then(|b| b.requested_size()), Some(64));

                    // Keep the pool from filling so every allocate succeeds
                    guard.deallocate(&name).unwrap();
                    assert_eq!(guard.process_count(), before);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(pool.lock().check_invariants(), Ok(()));
    assert!(pool.processes().is_empty());
}
