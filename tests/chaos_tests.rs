//! Chaos testing for concurrent access.
//!
//! Tests concurrent operations to find race conditions and deadlocks:
//! - Concurrent registrations of overlapping usernames
//! - Mixed read/write workloads against every backend
//! - Concurrent file snapshots coalescing into one consistent document

// Chaos tests use expect/unwrap/panic for simplicity - panics are acceptable in tests
// Excessive nesting is acceptable in concurrent test code with thread spawns
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::excessive_nesting,
    clippy::cast_precision_loss
)]

use focusgrid::Error;
use focusgrid::models::{Difficulty, NewScore, PageRequest, UserId};
use focusgrid::storage::{FileBackend, MemoryBackend, SqliteBackend, StorageBackend};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const GAME: &str = "number-game";

fn backends(dir: &TempDir) -> Vec<Arc<dyn StorageBackend>> {
    vec![
        Arc::new(MemoryBackend::new()),
        Arc::new(FileBackend::in_dir(dir.path().join("file")).unwrap()),
        Arc::new(SqliteBackend::new(dir.path().join("chaos.db")).unwrap()),
    ]
}

/// Test: many threads registering from a small pool of names.
///
/// Every name ends up registered exactly once, and every failure is a
/// duplicate.
#[test]
fn test_overlapping_registrations() {
    let dir = TempDir::new().unwrap();
    for store in backends(&dir) {
        let num_threads = 8;
        let names = 20;
        let barrier = Arc::new(Barrier::new(num_threads));
        let successes = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..num_threads)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                let successes = Arc::clone(&successes);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..names {
                        match store.create_user(&format!("name_{i}"), "digest") {
                            Ok(_) => {
                                successes.fetch_add(1, Ordering::SeqCst);
                            },
                            Err(Error::DuplicateUsername(_)) => {},
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(
            successes.load(Ordering::SeqCst),
            names,
            "backend {}",
            store.backend_name()
        );
        assert_eq!(store.count_users().unwrap(), names as u64);
    }
}

/// Test: mixed read/write workload should not deadlock or corrupt ordering.
#[test]
fn test_mixed_workload_no_deadlock() {
    let dir = TempDir::new().unwrap();
    for store in backends(&dir) {
        let players: Vec<UserId> = (0..4)
            .map(|i| {
                store
                    .create_user(&format!("player_{i}"), "digest")
                    .unwrap()
                    .into_inner()
                    .id
            })
            .collect();
        let players = Arc::new(players);

        let num_threads = 8;
        let ops_per_thread = 40;
        let completed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..num_threads)
            .map(|t| {
                let store = Arc::clone(&store);
                let players = Arc::clone(&players);
                let completed = Arc::clone(&completed);
                thread::spawn(move || {
                    for i in 0..ops_per_thread {
                        match (t + i) % 4 {
                            0 | 1 => {
                                let owner = &players[(t + i) % players.len()];
                                let time = 1.0 + ((t * ops_per_thread + i) % 97) as f64;
                                store
                                    .create_score(NewScore::new(
                                        owner.clone(),
                                        GAME,
                                        10,
                                        time,
                                        Difficulty::Easy,
                                    ))
                                    .unwrap();
                            },
                            2 => {
                                let board = store.leaderboard(GAME, Difficulty::Easy, 10).unwrap();
                                assert!(board.windows(2).all(|w| w[0].score.time <= w[1].score.time));
                            },
                            _ => {
                                let page = store.list_users(PageRequest::new(1, 10), "").unwrap();
                                assert_eq!(page.total, 4);
                                let _ = store.score_stats().unwrap();
                            },
                        }
                        completed.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        let timeout = Duration::from_secs(60);
        let start = Instant::now();
        for handle in handles {
            let remaining = timeout.saturating_sub(start.elapsed());
            assert!(
                !remaining.is_zero(),
                "Deadlock detected: threads did not complete in time"
            );
            handle.join().expect("Thread panicked");
        }

        assert_eq!(
            completed.load(Ordering::SeqCst),
            num_threads * ops_per_thread
        );
        assert_eq!(
            store.count_scores().unwrap(),
            (num_threads * ops_per_thread / 2) as u64,
            "backend {}",
            store.backend_name()
        );
    }
}

/// Test: concurrent mutations on the file backend leave a snapshot holding
/// every committed record.
#[test]
fn test_concurrent_file_snapshots_are_complete() {
    let dir = TempDir::new().unwrap();
    let num_threads: u32 = 6;
    let users_per_thread: u32 = 15;

    {
        let store = Arc::new(FileBackend::in_dir(dir.path()).unwrap());
        let handles: Vec<_> = (0..num_threads)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..users_per_thread {
                        let created = store
                            .create_user(&format!("t{t}_u{i}"), "digest")
                            .unwrap();
                        assert!(created.is_durable());
                        store
                            .create_score(NewScore::new(
                                created.value.id,
                                GAME,
                                1,
                                f64::from(i) + 0.5,
                                Difficulty::Hard,
                            ))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Thread panicked");
        }
    }

    let reopened = FileBackend::in_dir(dir.path()).unwrap();
    let expected = u64::from(num_threads * users_per_thread);
    assert_eq!(reopened.count_users().unwrap(), expected);
    assert_eq!(reopened.count_scores().unwrap(), expected);

    let names: HashSet<String> = reopened
        .list_users(PageRequest::new(1, 100), "")
        .unwrap()
        .items
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(names.len() as u64, expected);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(std::result::Result::ok)
        .filter(|e| !e.file_name().to_string_lossy().ends_with(".json"))
        .collect();
    assert!(leftovers.is_empty(), "temporary files left: {leftovers:?}");
}

/// Test: deleting users while others submit scores never leaves dangling
/// leaderboard rows.
#[test]
fn test_delete_while_submitting() {
    let dir = TempDir::new().unwrap();
    for store in backends(&dir) {
        let victims: Vec<UserId> = (0..10)
            .map(|i| {
                store
                    .create_user(&format!("victim_{i}"), "digest")
                    .unwrap()
                    .into_inner()
                    .id
            })
            .collect();

        let submitter = {
            let store = Arc::clone(&store);
            let victims = victims.clone();
            thread::spawn(move || {
                for (i, id) in victims.iter().cycle().take(100).enumerate() {
                    let result = store.create_score(NewScore::new(
                        id.clone(),
                        GAME,
                        1,
                        1.0 + i as f64,
                        Difficulty::Medium,
                    ));
                    match result {
                        Ok(_) | Err(Error::InvalidReference(_)) => {},
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            })
        };
        let deleter = {
            let store = Arc::clone(&store);
            let victims = victims.clone();
            thread::spawn(move || {
                for id in &victims {
                    store.delete_user(id).unwrap();
                }
            })
        };
        submitter.join().expect("Thread panicked");
        deleter.join().expect("Thread panicked");

        assert_eq!(store.count_users().unwrap(), 0);
        assert_eq!(store.count_scores().unwrap(), 0, "backend {}", store.backend_name());
        assert!(store.leaderboard(GAME, Difficulty::Medium, 100).unwrap().is_empty());
    }
}
