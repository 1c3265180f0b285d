// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::state::StopReason;
use chrono::Utc;
use yare::parameterized;

#[test]
fn body_reports_its_kind() {
    let body = EventBody::Stopped {
        reason: StopReason::Breakpoint,
        thread_id: Some(1),
        hit_breakpoint_ids: vec![3],
        description: None,
    };
    assert_eq!(body.kind(), EventKind::Stopped);

    let body = EventBody::Terminated { reason: None, exit_code: Some(0) };
    assert_eq!(body.kind(), EventKind::Terminated);
}

#[test]
fn event_serializes_with_type_tag() {
    let event = DebugEvent {
        seq: 4,
        kind: EventKind::Output,
        timestamp: Utc::now(),
        body: EventBody::Output { category: OutputCategory::Stdout, text: "hi\n".into() },
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "output");
    assert_eq!(json["seq"], 4);
    assert_eq!(json["body"]["type"], "output");
    assert_eq!(json["body"]["category"], "stdout");
}

#[parameterized(
    stdout = { Some("stdout"), OutputCategory::Stdout },
    stderr = { Some("stderr"), OutputCategory::Stderr },
    important = { Some("important"), OutputCategory::Important },
    telemetry = { Some("telemetry"), OutputCategory::Telemetry },
    console = { Some("console"), OutputCategory::Console },
    missing = { None, OutputCategory::Console },
    unknown = { Some("wat"), OutputCategory::Console },
)]
fn output_category_from_dap(raw: Option<&str>, expected: OutputCategory) {
    assert_eq!(OutputCategory::from_dap(raw), expected);
}

#[test]
fn terminated_eviction_reason_roundtrips() {
    let body = EventBody::Terminated { reason: Some("idle".into()), exit_code: None };
    let json = serde_json::to_string(&body).unwrap();
    let back: EventBody = serde_json::from_str(&json).unwrap();
    assert_eq!(back, body);
}
