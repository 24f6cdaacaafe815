//! Pool behavior against a real file journal.

use respool_core::{JournalEntry, PoolError, ResourceId, ResourceState};
use respool_journal::{replay_file, Durability};
use respool_pool::{PoolConfig, PoolManager};
use std::path::Path;

fn seeded(path: &Path, n: u64) -> PoolManager<respool_journal::FileJournal> {
    let mut pool = PoolManager::open(path, Durability::Flush, PoolConfig::default())
        .expect("journal should open");
    pool.seed_many((1..=n).map(ResourceId)).unwrap();
    pool
}

fn journal_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn first_allocation_is_first_seeded() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = seeded(&dir.path().join("log.txt"), 3);

    assert_eq!(pool.allocate().unwrap().id(), ResourceId(1));
}

#[test]
fn n_plus_one_allocation_exhausts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");
    let n = 5;
    let mut pool = seeded(&path, n);

    for _ in 0..n {
        pool.allocate().unwrap();
    }
    let err = pool.allocate().unwrap_err();
    assert!(matches!(err, PoolError::PoolExhausted));
    assert!(err.is_recoverable());
    assert_eq!(journal_lines(&path).len(), n as usize);
}

#[test]
fn released_resource_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = seeded(&dir.path().join("log.txt"), 3);

    let _one = pool.allocate().unwrap();
    let two = pool.allocate().unwrap();
    let _three = pool.allocate().unwrap();

    pool.release(two).unwrap();
    assert_eq!(pool.allocate().unwrap().id(), ResourceId(2));
}

#[test]
fn no_resource_is_handed_out_twice() {
    let dir = tempfile::tempdir().unwrap();
    let mut pool = seeded(&dir.path().join("log.txt"), 4);

    let mut held: Vec<ResourceId> = Vec::new();
    // Deterministic mix of allocations and releases.
    for step in 0..200u32 {
        if step % 3 == 2 && !held.is_empty() {
            let id = held.remove((step as usize / 3) % held.len());
            pool.release_id(id).unwrap();
        } else {
            match pool.allocate() {
                Ok(h) => {
                    assert!(!held.contains(&h.id()), "{} allocated twice", h.id());
                    held.push(h.id());
                }
                Err(PoolError::PoolExhausted) => assert_eq!(held.len(), 4),
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(pool.idle_count(), 4 - held.len());
    }
}

#[test]
fn journal_matches_calls_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");
    let mut pool = seeded(&path, 3);

    // The demonstration sequence.
    let r1 = pool.allocate().unwrap();
    pool.release(r1).unwrap();
    let r2 = pool.allocate().unwrap();
    let r3 = pool.allocate().unwrap();
    let r4 = pool.allocate().unwrap();
    pool.release(r2).unwrap();
    pool.release(r3).unwrap();
    let r5 = pool.allocate().unwrap();
    assert_eq!(r4.id(), ResourceId(3));
    assert_eq!(r5.id(), ResourceId(1));
    pool.close().unwrap();

    assert_eq!(
        journal_lines(&path),
        vec![
            "Allocated resource ID: 1",
            "Released resource ID: 1",
            "Allocated resource ID: 1",
            "Allocated resource ID: 2",
            "Allocated resource ID: 3",
            "Released resource ID: 1",
            "Released resource ID: 2",
            "Allocated resource ID: 1",
        ]
    );
}

#[test]
fn releasing_idle_resource_is_accepted_and_journaled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");
    let mut pool = seeded(&path, 2);

    pool.release_id(ResourceId(2)).unwrap();
    pool.release_id(ResourceId(2)).unwrap();
    assert_eq!(pool.state_of(ResourceId(2)), Some(ResourceState::Idle));
    assert_eq!(
        replay_file(&path).unwrap(),
        vec![
            JournalEntry::Released(ResourceId(2)),
            JournalEntry::Released(ResourceId(2)),
        ]
    );
}

#[test]
fn journal_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");

    {
        let mut pool = seeded(&path, 1);
        pool.allocate().unwrap();
    }
    {
        let mut pool = seeded(&path, 1);
        // The resource set is not persisted; resource 1 starts idle again.
        assert_eq!(pool.allocate().unwrap().id(), ResourceId(1));
    }

    assert_eq!(
        journal_lines(&path),
        vec!["Allocated resource ID: 1", "Allocated resource ID: 1"]
    );
}

#[test]
fn unopenable_journal_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("log.txt");

    let err = PoolManager::open(&path, Durability::Fsync, PoolConfig::default())
        .err()
        .expect("open should fail");
    assert!(matches!(err, PoolError::JournalUnavailable { .. }));
    assert!(!err.is_recoverable());
}
