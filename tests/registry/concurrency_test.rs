/*!
 * Registry Concurrency Tests
 */

use crate::support::{sh_registry, LONG_RUNNING};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use unit_supervisor::UnitState;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_list_never_observes_deleted_units() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(sh_registry(dir.path()));

    let ids: Vec<String> = (0..8)
        .map(|i| {
            registry
                .create(&format!("unit {}", i), LONG_RUNNING, None)
                .unwrap()
                .to_string()
        })
        .collect();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        tokio::task::spawn_blocking(move || {
            let mut snapshots = 0usize;
            while !done.load(Ordering::SeqCst) {
                for summary in registry.list() {
                    assert_ne!(summary.status, UnitState::Deleted);
                    assert!(!summary.name.is_empty());
                }
                snapshots += 1;
            }
            snapshots
        })
    };

    let deleters: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let registry = Arc::clone(&registry);
            tokio::task::spawn_blocking(move || registry.remove(&id))
        })
        .collect();
    for deleter in deleters {
        deleter.await.unwrap().unwrap();
    }

    done.store(true, Ordering::SeqCst);
    assert!(reader.await.unwrap() > 0);
    assert!(registry.list().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_same_id_admit_one() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(sh_registry(dir.path()));

    let attempts: Vec<_> = (0..6)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::task::spawn_blocking(move || {
                registry.create(&format!("racer {}", i), LONG_RUNNING, Some("contested"))
            })
        })
        .collect();

    let mut admitted = 0;
    for attempt in attempts {
        if attempt.await.unwrap().is_ok() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 1);
    assert_eq!(registry.len(), 1);
    registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_list_only_shows_fully_created_units() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(sh_registry(dir.path()));

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        tokio::task::spawn_blocking(move || {
            let mut seen = 0usize;
            while !done.load(Ordering::SeqCst) {
                for summary in registry.list() {
                    let detail = registry.get(&summary.id).unwrap();
                    let started = detail
                        .summary
                        .logs
                        .iter()
                        .any(|l| l.starts_with("[SYSTEM] process started"));
                    assert!(started, "unit {} listed before launch", summary.id);
                    seen = seen.max(registry.list().len());
                }
            }
            seen
        })
    };

    let creators: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::task::spawn_blocking(move || {
                registry.create(&format!("unit {}", i), LONG_RUNNING, Some(&format!("unit-{}", i)))
            })
        })
        .collect();
    for creator in creators {
        let id = creator.await.unwrap().unwrap();
        assert!(registry.store().path_for(&id).exists());
    }

    done.store(true, Ordering::SeqCst);
    assert!(reader.await.unwrap() <= 8);
    assert_eq!(registry.list().len(), 8);
    registry.shutdown().await;
}
