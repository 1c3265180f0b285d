// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::testing::{Emit, Eval, FakeDebugpy, Scenario};
use dapmux_core::{EventKind, FakeClock, OutputCategory};
use dapmux_dap::adapter::LaunchConfig;
use std::collections::VecDeque;
use std::time::Duration;

struct Harness {
    _dir: tempfile::TempDir,
    clock: Arc<FakeClock>,
    session: Arc<Session>,
}

async fn harness(scenario: Scenario) -> Harness {
    harness_with_breakpoints(scenario, BTreeMap::new()).await
}

async fn harness_with_breakpoints(
    scenario: Scenario,
    staged: BTreeMap<PathBuf, Vec<BreakpointSpec>>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new());
    let fake = FakeDebugpy::with(scenario);
    let config = Arc::new(RelayConfig::default());
    let session = Session::create(SessionArgs {
        id: SessionId::mint(),
        name: "test session".to_string(),
        project_root: PathBuf::from("/proj"),
        config: Arc::clone(&config),
        clock: clock.clone(),
        connector: fake.connector(),
        breakpoint_store: BreakpointStore::new(dir.path()),
        session_store: SessionStore::new(dir.path()),
        staged_breakpoints: staged,
        watches: Vec::new(),
        idle_timeout: config.session_timeout(),
        default_stop_on_entry: false,
        created_at: None,
    })
    .await
    .unwrap();
    Harness { _dir: dir, clock, session }
}

fn program() -> LaunchConfig {
    LaunchConfig { program: Some(PathBuf::from("/proj/main.py")), ..Default::default() }
}

/// Poll until an event of `kind` shows up, returning it.
async fn wait_for(session: &Session, kind: EventKind) -> dapmux_core::DebugEvent {
    let mut cursor: Option<String> = None;
    for _ in 0..50 {
        let slice = session
            .poll_events(cursor.as_deref(), 100, Duration::from_millis(200))
            .await
            .unwrap();
        if let Some(event) = slice.events.iter().find(|e| e.kind == kind) {
            return event.clone();
        }
        cursor = slice.next_cursor;
    }
    panic!("no {kind:?} event arrived");
}

#[tokio::test]
async fn create_starts_in_created_with_capabilities() {
    let h = harness(Scenario::default()).await;
    let view = h.session.view();
    assert_eq!(view.state, SessionState::Created);
    assert_eq!(view.adapter_capabilities.get("supportsLogPoints"), Some(&true));
    assert_eq!(view.breakpoint_count, 0);
    assert!(view.stop_reason.is_none());
}

#[tokio::test]
async fn gated_ops_reject_without_state_change() {
    let h = harness(Scenario::default()).await;

    let err = h.session.continue_(None).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_SESSION_STATE");
    assert_eq!(h.session.state(), SessionState::Created);

    let err = h.session.threads().await.unwrap_err();
    assert_eq!(err.code(), "INVALID_SESSION_STATE");

    let err = h.session.evaluate("x", None, None).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_SESSION_STATE");
    assert_eq!(h.session.state(), SessionState::Created);
}

#[tokio::test]
async fn launch_transitions_to_running() {
    let h = harness(Scenario::default()).await;
    h.session.launch(program()).await.unwrap();
    assert!(matches!(
        h.session.state(),
        SessionState::Running | SessionState::Paused
    ));
    // Second launch is rejected.
    let err = h.session.launch(program()).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_SESSION_STATE");
}

#[tokio::test]
async fn stop_on_entry_pauses_at_entry() {
    let h = harness(Scenario::default()).await;
    let config = LaunchConfig { stop_on_entry: true, ..program() };
    h.session.launch(config).await.unwrap();

    let stopped = wait_for(&h.session, EventKind::Stopped).await;
    let EventBody::Stopped { reason, .. } = stopped.body else { panic!() };
    assert_eq!(reason, StopReason::Entry);
    assert_eq!(h.session.state(), SessionState::Paused);
}

#[tokio::test]
async fn breakpoint_hit_roundtrip() {
    // Script: stop at a breakpoint on line 5, then inspect, then finish.
    let scenario = Scenario {
        on_launch: vec![Emit::Stopped { reason: "breakpoint", thread_id: 1, hit_ids: vec![1] }],
        on_continue: VecDeque::new(),
        ..Default::default()
    };
    let h = harness(scenario).await;

    // Staged in created state: echoed unverified.
    let update = h
        .session
        .set_breakpoints(
            PathBuf::from("/proj/main.py"),
            vec![BreakpointSpec::new("/proj/main.py", 5)],
        )
        .await
        .unwrap();
    assert_eq!(update.breakpoints.len(), 1);
    assert!(!update.breakpoints[0].verified);

    h.session.launch(program()).await.unwrap();
    let stopped = wait_for(&h.session, EventKind::Stopped).await;
    let EventBody::Stopped { reason, thread_id, hit_breakpoint_ids, .. } = stopped.body else {
        panic!()
    };
    assert_eq!(reason, StopReason::Breakpoint);
    assert_eq!(thread_id, Some(1));
    assert_eq!(hit_breakpoint_ids, vec![1]);
    assert_eq!(h.session.state(), SessionState::Paused);

    // Top frame: calc at line 5; current_frame_location refreshes.
    let (frames, _) = h.session.stack_trace(None, None, None).await.unwrap();
    assert_eq!(frames[0].name, "calc");
    assert_eq!(frames[0].line, 5);
    let view = h.session.view();
    let frame = view.current_frame_location.unwrap();
    assert_eq!(frame.line, 5);
    assert_eq!(frame.name, "calc");

    // Locals scope with a live variables reference.
    let scopes = h.session.scopes(frames[0].id).await.unwrap();
    assert_eq!(scopes[0].name, "Locals");
    assert!(scopes[0].variables_reference > 0);

    let variables = h.session.variables(scopes[0].variables_reference, None, None).await.unwrap();
    let names: Vec<&str> = variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["x", "y"]);
    assert_eq!(variables[0].value, "10");
    assert_eq!(variables[1].value, "20");

    let outcome = h.session.evaluate("x+y", Some(frames[0].id), None).await.unwrap();
    assert_eq!(outcome.result.as_deref(), Some("30"));
    assert_eq!(outcome.type_name.as_deref(), Some("int"));
    assert!(outcome.error.is_none());

    // Resume; the program runs to completion.
    h.session.continue_(None).await.unwrap();
    assert!(matches!(
        h.session.state(),
        SessionState::Running | SessionState::Terminated
    ));
    wait_for(&h.session, EventKind::Terminated).await;
    assert_eq!(h.session.state(), SessionState::Terminated);
    assert_eq!(h.session.view().exit_code, Some(0));
}

#[tokio::test]
async fn launch_failure_returns_to_created() {
    let scenario = Scenario {
        fail_launch: Some("can't open file '/proj/missing.py'".to_string()),
        ..Default::default()
    };
    let h = harness(scenario).await;

    let err = h.session.launch(program()).await.unwrap_err();
    assert_eq!(err.code(), "LAUNCH_SCRIPT_NOT_FOUND");
    assert_eq!(h.session.state(), SessionState::Created);

    // The session is reusable after a failed launch.
    let err = h.session.continue_(None).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_SESSION_STATE");
}

#[tokio::test]
async fn output_flows_to_buffer_and_events() {
    let scenario = Scenario {
        on_launch: vec![
            Emit::Output { category: "stdout", text: "Result: 30\n".to_string() },
            Emit::Exited { code: 0 },
            Emit::Terminated,
        ],
        ..Default::default()
    };
    let h = harness(scenario).await;
    h.session.launch(program()).await.unwrap();
    wait_for(&h.session, EventKind::Terminated).await;

    let page = h.session.get_output(0, 100, None);
    assert_eq!(page.lines.len(), 1);
    assert!(page.lines[0].text.contains("Result: 30"));
    assert_eq!(page.lines[0].category, OutputCategory::Stdout);
    assert!(!page.truncated);

    let output_event = wait_for(&h.session, EventKind::Output).await;
    let EventBody::Output { text, .. } = output_event.body else { panic!() };
    assert!(text.contains("Result: 30"));
}

#[tokio::test]
async fn evaluate_error_is_a_success_with_error_body() {
    let mut scenario = Scenario::default();
    scenario.evaluations.insert(
        "boom()".to_string(),
        Eval::Raise { message: "NameError: name 'boom' is not defined".to_string() },
    );
    let h = harness(scenario).await;
    h.session.launch(LaunchConfig { stop_on_entry: true, ..program() }).await.unwrap();
    wait_for(&h.session, EventKind::Stopped).await;

    let outcome = h.session.evaluate("boom()", None, None).await.unwrap();
    assert!(outcome.result.is_none());
    assert!(outcome.error.as_deref().unwrap_or_default().contains("NameError"));
}

#[tokio::test]
async fn watches_evaluate_with_per_expression_failures() {
    let mut scenario = Scenario::default();
    scenario.evaluations.insert(
        "missing".to_string(),
        Eval::Raise { message: "NameError: name 'missing' is not defined".to_string() },
    );
    let h = harness(scenario).await;

    h.session.add_watch("x+y".to_string()).unwrap();
    h.session.add_watch("missing".to_string()).unwrap();
    // Duplicates keep their original position.
    let watches = h.session.add_watch("x+y".to_string()).unwrap();
    assert_eq!(watches, vec!["x+y".to_string(), "missing".to_string()]);

    h.session.launch(LaunchConfig { stop_on_entry: true, ..program() }).await.unwrap();
    wait_for(&h.session, EventKind::Stopped).await;

    let evaluations = h.session.evaluate_watches().await.unwrap();
    assert_eq!(evaluations.len(), 2);
    assert_eq!(evaluations[0].value.as_deref(), Some("30"));
    assert!(evaluations[0].error.is_none());
    assert!(evaluations[1].value.is_none());
    assert!(evaluations[1].error.is_some());

    assert!(h.session.remove_watch("missing").unwrap());
    assert!(!h.session.remove_watch("missing").unwrap());
    assert_eq!(h.session.list_watches().unwrap(), vec!["x+y".to_string()]);
}

#[tokio::test]
async fn step_returns_to_paused_at_next_stop() {
    let h = harness(Scenario::default()).await;
    h.session.launch(LaunchConfig { stop_on_entry: true, ..program() }).await.unwrap();
    wait_for(&h.session, EventKind::Stopped).await;

    h.session.step_next(None).await.unwrap();
    let stopped = wait_for_nth_stop(&h.session, 2).await;
    let EventBody::Stopped { reason, .. } = stopped else { panic!() };
    assert_eq!(reason, StopReason::Step);
    assert_eq!(h.session.state(), SessionState::Paused);
}

async fn wait_for_nth_stop(session: &Session, n: usize) -> EventBody {
    let mut seen = 0;
    let mut cursor: Option<String> = None;
    for _ in 0..50 {
        let slice = session
            .poll_events(cursor.as_deref(), 100, Duration::from_millis(200))
            .await
            .unwrap();
        for event in &slice.events {
            if event.kind == EventKind::Stopped {
                seen += 1;
                if seen == n {
                    return event.body.clone();
                }
            }
        }
        cursor = slice.next_cursor;
    }
    panic!("did not see {n} stops");
}

#[tokio::test]
async fn pause_lands_via_stopped_event() {
    let h = harness(Scenario::default()).await;
    h.session.launch(program()).await.unwrap();
    assert_eq!(h.session.state(), SessionState::Running);

    h.session.pause(None).await.unwrap();
    let stopped = wait_for(&h.session, EventKind::Stopped).await;
    let EventBody::Stopped { reason, .. } = stopped.body else { panic!() };
    assert_eq!(reason, StopReason::Pause);
    assert_eq!(h.session.state(), SessionState::Paused);
}

#[tokio::test]
async fn set_breakpoints_live_returns_adapter_verification() {
    let h = harness(Scenario::default()).await;
    h.session.launch(LaunchConfig { stop_on_entry: true, ..program() }).await.unwrap();
    wait_for(&h.session, EventKind::Stopped).await;

    let update = h
        .session
        .set_breakpoints(
            PathBuf::from("/proj/main.py"),
            vec![BreakpointSpec::new("/proj/main.py", 5), BreakpointSpec::new("/proj/main.py", 9)],
        )
        .await
        .unwrap();
    assert_eq!(update.breakpoints.len(), 2);
    assert!(update.breakpoints.iter().all(|b| b.verified));
    assert!(update.breakpoints.iter().all(|b| b.id.is_some()));
}

#[tokio::test]
async fn breakpoint_validation_rejects_bad_input() {
    let h = harness(Scenario::default()).await;

    let err = h
        .session
        .set_breakpoints(PathBuf::from("relative.py"), vec![BreakpointSpec::new("relative.py", 5)])
        .await
        .unwrap_err();
    assert_eq!(err.code(), "BREAKPOINT_INVALID_PATH");

    let err = h
        .session
        .set_breakpoints(
            PathBuf::from("/proj/main.py"),
            vec![BreakpointSpec::new("/proj/main.py", 0)],
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "BREAKPOINT_INVALID_LINE");
    assert_eq!(h.session.view().breakpoint_count, 0);
}

#[tokio::test]
async fn clear_breakpoints_counts_removals() {
    let h = harness(Scenario::default()).await;
    h.session
        .set_breakpoints(
            PathBuf::from("/proj/a.py"),
            vec![BreakpointSpec::new("/proj/a.py", 1), BreakpointSpec::new("/proj/a.py", 2)],
        )
        .await
        .unwrap();
    h.session
        .set_breakpoints(PathBuf::from("/proj/b.py"), vec![BreakpointSpec::new("/proj/b.py", 3)])
        .await
        .unwrap();

    let outcome = h.session.clear_breakpoints(Some(PathBuf::from("/proj/a.py"))).await.unwrap();
    assert_eq!(outcome.removed, 2);

    let outcome = h.session.clear_breakpoints(None).await.unwrap();
    assert_eq!(outcome.removed, 1);
    assert!(h.session.get_breakpoints().unwrap().is_empty());
}

#[tokio::test]
async fn staged_breakpoints_from_persistence_are_visible() {
    let mut staged = BTreeMap::new();
    staged.insert(
        PathBuf::from("/proj/f1.py"),
        vec![BreakpointSpec::new("/proj/f1.py", 10)],
    );
    staged.insert(
        PathBuf::from("/proj/f2.py"),
        vec![BreakpointSpec::new("/proj/f2.py", 20)],
    );
    let h = harness_with_breakpoints(Scenario::default(), staged).await;

    let breakpoints = h.session.get_breakpoints().unwrap();
    assert_eq!(breakpoints.len(), 2);
    assert_eq!(breakpoints[&PathBuf::from("/proj/f1.py")][0].line, 10);
    assert_eq!(breakpoints[&PathBuf::from("/proj/f2.py")][0].line, 20);
}

#[tokio::test]
async fn terminate_is_idempotent_and_stamps_runtime() {
    let h = harness(Scenario::default()).await;
    h.session.launch(program()).await.unwrap();
    h.clock.advance(Duration::from_secs(42));

    let outcome = h.session.terminate(None).await;
    assert!(outcome.deleted);
    assert_eq!(outcome.runtime_seconds, 42);
    assert_eq!(h.session.state(), SessionState::Terminated);

    // Exactly one terminated event in the queue.
    let slice = h.session.poll_events(None, 100, Duration::ZERO).await.unwrap();
    let terminated = slice
        .events
        .iter()
        .filter(|e| e.kind == EventKind::Terminated)
        .count();
    assert_eq!(terminated, 1);

    // A second terminate stays clean.
    let outcome = h.session.terminate(None).await;
    assert!(outcome.deleted);
    let slice = h.session.poll_events(None, 100, Duration::ZERO).await.unwrap();
    let terminated = slice
        .events
        .iter()
        .filter(|e| e.kind == EventKind::Terminated)
        .count();
    assert_eq!(terminated, 1);
}

#[tokio::test]
async fn eviction_reason_reaches_pollers() {
    let h = harness(Scenario::default()).await;
    h.session.terminate(Some("idle")).await;

    let slice = h.session.poll_events(None, 100, Duration::ZERO).await.unwrap();
    let event = slice.events.iter().find(|e| e.kind == EventKind::Terminated).unwrap();
    let EventBody::Terminated { reason, .. } = &event.body else { panic!() };
    assert_eq!(reason.as_deref(), Some("idle"));
}

#[tokio::test]
async fn activity_clock_updates_on_ops() {
    let h = harness(Scenario::default()).await;
    let before = h.session.view().last_activity_at;

    h.clock.advance(Duration::from_secs(10));
    h.session.list_watches().unwrap();
    let after = h.session.view().last_activity_at;
    assert_eq!((after - before).num_seconds(), 10);
    assert_eq!(h.session.idle_for(), Duration::ZERO);
}

#[tokio::test]
async fn inspect_variable_expands_children() {
    let mut scenario = Scenario::default();
    scenario.evaluations.insert(
        "point".to_string(),
        Eval::Ok {
            result: "Point(x=1, y=2)".to_string(),
            type_name: "Point".to_string(),
            variables_reference: 200,
        },
    );
    scenario.variables.insert(
        200,
        vec![
            ("x".to_string(), "1".to_string(), "int".to_string(), 0),
            ("y".to_string(), "2".to_string(), "int".to_string(), 0),
        ],
    );
    let h = harness(scenario).await;
    h.session.launch(LaunchConfig { stop_on_entry: true, ..program() }).await.unwrap();
    wait_for(&h.session, EventKind::Stopped).await;

    let inspection = h.session.inspect_variable("point", None, None).await.unwrap();
    assert_eq!(inspection.value.as_deref(), Some("Point(x=1, y=2)"));
    assert_eq!(inspection.children.len(), 2);
    assert_eq!(inspection.children[0].name, "x");
}
