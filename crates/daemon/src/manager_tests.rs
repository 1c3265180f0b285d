// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::facade::types::CreateSessionParams;
use crate::testing::FakeDebugpy;
use dapmux_core::{BreakpointSpec, EventKind, FakeClock, RelayConfig, SessionState};
use dapmux_dap::adapter::LaunchConfig;

struct Harness {
    dir: tempfile::TempDir,
    clock: Arc<FakeClock>,
    manager: Arc<SessionManager>,
}

fn manager_with(config: RelayConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    manager_in(config, dir)
}

fn manager_in(config: RelayConfig, dir: tempfile::TempDir) -> Harness {
    let clock = Arc::new(FakeClock::new());
    let fake = FakeDebugpy::new();
    let manager = SessionManager::new(config, clock.clone(), fake.connector(), dir.path());
    Harness { dir, clock, manager }
}

fn params(root: &str) -> CreateSessionParams {
    CreateSessionParams {
        project_root: PathBuf::from(root),
        name: None,
        timeout_minutes: None,
        stop_on_entry: None,
    }
}

#[tokio::test]
async fn create_registers_and_get_finds() {
    let h = manager_with(RelayConfig::default());
    let session = h.manager.create(params("/proj")).await.unwrap();
    assert!(dapmux_core::SessionId::is_well_formed(session.id().as_str()));
    assert_eq!(session.name(), "debug proj");

    let found = h.manager.get(session.id().as_str()).unwrap();
    assert_eq!(found.id(), session.id());
    assert_eq!(h.manager.len(), 1);
}

#[tokio::test]
async fn get_unknown_is_not_found() {
    let h = manager_with(RelayConfig::default());
    let err = h.manager.get("sess_deadbeef").unwrap_err();
    assert_eq!(err.code(), "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn relative_project_root_is_rejected() {
    let h = manager_with(RelayConfig::default());
    let err = h.manager.create(params("proj")).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_REQUEST");
}

#[tokio::test]
async fn admission_cap_is_enforced_and_frees_on_terminate() {
    let h = manager_with(RelayConfig { max_sessions: 2, ..Default::default() });

    let first = h.manager.create(params("/proj")).await.unwrap();
    h.manager.create(params("/proj")).await.unwrap();

    let err = h.manager.create(params("/proj")).await.unwrap_err();
    assert_eq!(err.code(), "SESSION_LIMIT_REACHED");
    assert_eq!(err.http_status(), 429);

    h.manager.terminate(first.id().as_str()).await.unwrap();
    h.manager.create(params("/proj")).await.unwrap();
    assert_eq!(h.manager.len(), 2);
}

#[tokio::test]
async fn terminate_is_not_idempotent_at_the_registry() {
    let h = manager_with(RelayConfig::default());
    let session = h.manager.create(params("/proj")).await.unwrap();
    let id = session.id().as_str().to_string();

    let outcome = h.manager.terminate(&id).await.unwrap();
    assert!(outcome.deleted);

    let err = h.manager.terminate(&id).await.unwrap_err();
    assert_eq!(err.code(), "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn idle_sessions_are_evicted_with_reason() {
    let h = manager_with(RelayConfig { session_timeout_seconds: 100, ..Default::default() });
    let session = h.manager.create(params("/proj")).await.unwrap();

    h.clock.advance(Duration::from_secs(50));
    h.manager.evict_expired().await;
    assert_eq!(h.manager.len(), 1, "not idle yet");

    h.clock.advance(Duration::from_secs(51));
    h.manager.evict_expired().await;
    assert_eq!(h.manager.len(), 0);

    // The poller-visible event carries the eviction reason.
    let slice = session.poll_events(None, 100, Duration::ZERO).await.unwrap();
    let event = slice
        .events
        .iter()
        .find(|e| e.kind == EventKind::Terminated)
        .expect("terminated event");
    let dapmux_core::EventBody::Terminated { reason, .. } = &event.body else { panic!() };
    assert_eq!(reason.as_deref(), Some("idle"));
}

#[tokio::test]
async fn activity_defers_idle_eviction() {
    let h = manager_with(RelayConfig { session_timeout_seconds: 100, ..Default::default() });
    let session = h.manager.create(params("/proj")).await.unwrap();

    h.clock.advance(Duration::from_secs(80));
    h.manager.get(session.id().as_str()).unwrap(); // refreshes activity
    h.clock.advance(Duration::from_secs(80));
    h.manager.evict_expired().await;
    assert_eq!(h.manager.len(), 1);
}

#[tokio::test]
async fn lifetime_cap_evicts_active_sessions() {
    let h = manager_with(RelayConfig {
        session_timeout_seconds: 10_000,
        session_max_lifetime_seconds: 200,
        ..Default::default()
    });
    let session = h.manager.create(params("/proj")).await.unwrap();

    h.clock.advance(Duration::from_secs(150));
    h.manager.get(session.id().as_str()).unwrap();
    h.clock.advance(Duration::from_secs(60));
    h.manager.evict_expired().await;
    assert_eq!(h.manager.len(), 0);

    let slice = session.poll_events(None, 100, Duration::ZERO).await.unwrap();
    let event = slice.events.iter().find(|e| e.kind == EventKind::Terminated).unwrap();
    let dapmux_core::EventBody::Terminated { reason, .. } = &event.body else { panic!() };
    assert_eq!(reason.as_deref(), Some("lifetime"));
}

#[tokio::test]
async fn per_session_timeout_override() {
    let h = manager_with(RelayConfig { session_timeout_seconds: 10_000, ..Default::default() });
    let mut p = params("/proj");
    p.timeout_minutes = Some(1);
    h.manager.create(p).await.unwrap();

    h.clock.advance(Duration::from_secs(61));
    h.manager.evict_expired().await;
    assert_eq!(h.manager.len(), 0);
}

#[tokio::test]
async fn breakpoints_persist_across_manager_restart() {
    let h = manager_with(RelayConfig::default());
    let root = h.dir.path().join("project");
    std::fs::create_dir_all(&root).unwrap();

    let session = h.manager.create(params(root.to_str().unwrap())).await.unwrap();
    session
        .set_breakpoints(root.join("f1.py"), vec![BreakpointSpec::new(root.join("f1.py"), 10)])
        .await
        .unwrap();
    session
        .set_breakpoints(root.join("f2.py"), vec![BreakpointSpec::new(root.join("f2.py"), 20)])
        .await
        .unwrap();
    h.manager.terminate(session.id().as_str()).await.unwrap();

    // New manager over the same data dir sees the staged set pre-launch.
    let h2 = manager_in(RelayConfig::default(), h.dir);
    let session = h2.manager.create(params(root.to_str().unwrap())).await.unwrap();
    let breakpoints = session.get_breakpoints().unwrap();
    assert_eq!(breakpoints.len(), 2);
    assert_eq!(breakpoints[&root.join("f1.py")][0].line, 10);
    assert_eq!(breakpoints[&root.join("f2.py")][0].line, 20);
}

#[tokio::test]
async fn recovery_lists_unterminated_sessions_only() {
    let h = manager_with(RelayConfig::default());
    let root = h.dir.path().join("project");
    std::fs::create_dir_all(&root).unwrap();
    let root_str = root.to_str().unwrap();

    let keep = h.manager.create(params(root_str)).await.unwrap();
    keep.add_watch("x".to_string()).unwrap();
    let gone = h.manager.create(params(root_str)).await.unwrap();
    h.manager.terminate(gone.id().as_str()).await.unwrap();
    let keep_id = keep.id().clone();

    h.manager.shutdown().await;

    // Restarted relay: only the unterminated session is recoverable.
    let h2 = manager_in(RelayConfig::default(), h.dir);
    h2.manager.recover();
    let recoverable = h2.manager.list_recoverable();
    assert_eq!(recoverable.len(), 1);
    assert_eq!(recoverable[0].id, keep_id);
    assert_eq!(recoverable[0].watches, vec!["x".to_string()]);

    // Recovered sessions come back in created state with their watches.
    let revived = h2.manager.recover_session(keep_id.as_str()).await.unwrap();
    assert_eq!(revived.state(), SessionState::Created);
    assert_eq!(revived.id(), &keep_id);
    assert_eq!(revived.list_watches().unwrap(), vec!["x".to_string()]);
    assert!(h2.manager.list_recoverable().is_empty());
}

#[tokio::test]
async fn recovery_skips_vanished_project_roots() {
    let h = manager_with(RelayConfig::default());
    let root = h.dir.path().join("doomed");
    std::fs::create_dir_all(&root).unwrap();
    h.manager.create(params(root.to_str().unwrap())).await.unwrap();
    h.manager.shutdown().await;

    std::fs::remove_dir_all(&root).unwrap();
    let h2 = manager_in(RelayConfig::default(), h.dir);
    h2.manager.recover();
    assert!(h2.manager.list_recoverable().is_empty());
}

#[tokio::test]
async fn recovered_session_can_launch() {
    let h = manager_with(RelayConfig::default());
    let root = h.dir.path().join("project");
    std::fs::create_dir_all(&root).unwrap();
    let session = h.manager.create(params(root.to_str().unwrap())).await.unwrap();
    let id = session.id().clone();
    h.manager.shutdown().await;

    let h2 = manager_in(RelayConfig::default(), h.dir);
    h2.manager.recover();
    let revived = h2.manager.recover_session(id.as_str()).await.unwrap();
    revived
        .launch(LaunchConfig {
            program: Some(root.join("main.py")),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(revived.state(), SessionState::Running);
}

#[tokio::test]
async fn shutdown_terminates_everything() {
    let h = manager_with(RelayConfig::default());
    let a = h.manager.create(params("/proj")).await.unwrap();
    let b = h.manager.create(params("/proj")).await.unwrap();

    h.manager.shutdown().await;
    assert!(h.manager.is_empty());
    assert_eq!(a.state(), SessionState::Terminated);
    assert_eq!(b.state(), SessionState::Terminated);
}

#[tokio::test]
async fn list_is_ordered_by_creation() {
    let h = manager_with(RelayConfig::default());
    let a = h.manager.create(params("/proj")).await.unwrap();
    h.clock.advance(Duration::from_secs(5));
    let b = h.manager.create(params("/proj")).await.unwrap();

    let listed = h.manager.list();
    assert_eq!(listed[0].id(), a.id());
    assert_eq!(listed[1].id(), b.id());
}
