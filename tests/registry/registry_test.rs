/*!
 * Registry Tests
 * Create, control and delete units through the registry
 */

use crate::support::{sh_config, sh_registry, wait_for, FAST_EXIT, LONG_RUNNING};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tempfile::TempDir;
use unit_supervisor::{Registry, RuntimeConfig, SupervisorError, UnitId, UnitState};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_create_persists_source_and_launches() {
    let dir = TempDir::new().unwrap();
    let registry = sh_registry(dir.path());

    let id = registry.create("echoer", LONG_RUNNING, None).unwrap();
    let path = registry.store().path_for(&id);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), LONG_RUNNING);
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("sh"));

    let detail = registry.get(id.as_str()).unwrap();
    assert_eq!(detail.summary.name, "echoer");
    assert_eq!(detail.summary.status, UnitState::Starting);
    assert!(detail.pid.is_some());

    assert!(wait_for(Duration::from_secs(3), || {
        registry.get(id.as_str()).map(|d| d.summary.status) == Ok(UnitState::Online)
    })
    .await);

    registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_requested_id_and_default_name() {
    let dir = TempDir::new().unwrap();
    let registry = sh_registry(dir.path());

    let id = registry.create("  ", LONG_RUNNING, Some("my-bot_1")).unwrap();
    assert_eq!(id.as_str(), "my-bot_1");
    assert_eq!(registry.get("my-bot_1").unwrap().summary.name, "my-bot_1");

    let invalid = registry.create("x", LONG_RUNNING, Some("../escape"));
    assert!(matches!(invalid, Err(SupervisorError::InvalidRequest(_))));
    assert_eq!(registry.len(), 1);

    registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_duplicate_and_retired_ids_are_rejected() {
    let dir = TempDir::new().unwrap();
    let registry = sh_registry(dir.path());

    registry.create("a", LONG_RUNNING, Some("dup")).unwrap();
    let again = registry.create("b", LONG_RUNNING, Some("dup"));
    assert!(matches!(again, Err(SupervisorError::AlreadyExists(_))));
    assert_eq!(registry.get("dup").unwrap().summary.name, "a");

    registry.remove("dup").unwrap();
    let reused = registry.create("c", LONG_RUNNING, Some("dup"));
    assert!(matches!(reused, Err(SupervisorError::AlreadyExists(_))));
    assert!(!registry.contains("dup"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawn_failure_leaves_no_residue() {
    let dir = TempDir::new().unwrap();
    let config = sh_config(dir.path())
        .with_runtime(RuntimeConfig::new("definitely-not-a-runtime-7f3a").with_extension("sh"));
    let registry = Registry::from_config(&config).unwrap();

    let result = registry.create("broken", LONG_RUNNING, Some("broken"));
    assert!(matches!(result, Err(SupervisorError::SpawnFailure(_))));

    assert!(registry.is_empty());
    assert!(registry.list().is_empty());
    assert!(registry.logs("broken").is_empty());
    assert!(!registry.store().path_for(&UnitId::parse("broken").unwrap()).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_create_releases_reserved_id() {
    let dir = TempDir::new().unwrap();
    let config = sh_config(dir.path())
        .with_runtime(RuntimeConfig::new("definitely-not-a-runtime-7f3a").with_extension("sh"));
    let registry = Registry::from_config(&config).unwrap();

    for _ in 0..2 {
        let result = registry.create("retry", LONG_RUNNING, Some("retry"));
        assert!(matches!(result, Err(SupervisorError::SpawnFailure(_))));
    }
    assert!(registry.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_ids() {
    let dir = TempDir::new().unwrap();
    let registry = sh_registry(dir.path());

    assert!(registry.stop("nope").unwrap_err().is_not_found());
    assert!(registry.restart("nope").unwrap_err().is_not_found());
    assert!(registry.remove("nope").unwrap_err().is_not_found());
    assert!(registry.get("nope").unwrap_err().is_not_found());
    assert!(registry.logs("nope").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_lifecycle_leaves_no_residue() {
    let dir = TempDir::new().unwrap();
    let registry = sh_registry(dir.path());

    let id = registry.create("cycle", LONG_RUNNING, None).unwrap();
    let path = registry.store().path_for(&id);

    assert!(registry.stop(id.as_str()).unwrap());
    assert!(!registry.stop(id.as_str()).unwrap());
    assert_eq!(registry.get(id.as_str()).unwrap().summary.status, UnitState::Offline);

    registry.restart(id.as_str()).unwrap();
    assert!(wait_for(Duration::from_secs(3), || {
        registry.get(id.as_str()).map(|d| d.summary.status) == Ok(UnitState::Online)
    })
    .await);

    let logs = registry.logs(id.as_str());
    assert!(logs.iter().any(|l| l == "[SYSTEM] stopped by request"));
    assert!(logs.iter().any(|l| l == "[SYSTEM] restart requested"));

    registry.remove(id.as_str()).unwrap();
    assert!(!path.exists());
    assert!(registry.logs(id.as_str()).is_empty());
    assert!(registry.log_entries(id.as_str()).is_empty());
    assert!(!registry.supervisor().logs().contains(&id));
    assert!(registry.list().is_empty());
    assert!(registry.get(id.as_str()).unwrap_err().is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_crashed_unit_reports_exit_code() {
    let dir = TempDir::new().unwrap();
    let registry = sh_registry(dir.path());

    let id = registry.create("crash", FAST_EXIT, None).unwrap();
    assert!(wait_for(Duration::from_secs(3), || {
        registry.get(id.as_str()).map(|d| d.exit_code) == Ok(Some(3))
    })
    .await);

    let detail = registry.get(id.as_str()).unwrap();
    assert_eq!(detail.summary.status, UnitState::Offline);
    assert_eq!(detail.pid, None);
    assert!(detail
        .summary
        .logs
        .contains(&"[SYSTEM] process exited with code 3".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_list_preserves_insertion_order() {
    let dir = TempDir::new().unwrap();
    let registry = sh_registry(dir.path());

    let names = ["zeta", "alpha", "mid", "beta"];
    for name in names {
        registry.create(name, LONG_RUNNING, Some(name)).unwrap();
    }
    registry.remove("mid").unwrap();

    let listed: Vec<String> = registry.list().into_iter().map(|s| s.id).collect();
    assert_eq!(listed, vec!["zeta", "alpha", "beta"]);

    registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delete_during_pending_restart_never_reappears() {
    let dir = TempDir::new().unwrap();
    let registry = sh_registry(dir.path());

    let id = registry.create("flaky", LONG_RUNNING, None).unwrap();
    let path = registry.store().path_for(&id);
    registry.restart(id.as_str()).unwrap();
    registry.remove(id.as_str()).unwrap();

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(!registry.contains(id.as_str()));
    assert!(registry.logs(id.as_str()).is_empty());
    assert!(!path.exists());
    assert!(registry.supervisor().timers().is_empty());
}
