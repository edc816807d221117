//! Filter semantics of recording queries, end to end.
//!
//! One session is recorded through the scripted browser per test; queries
//! then run against the persisted file the way a transport would issue
//! them. Bound handling on hand-built recordings is covered by unit
//! tests; here the timestamps are the real capture stamps.

mod common;

use common::{
    click_notification, console_notification, js_error_notification, scripted_recorder,
    ScriptedBrowser,
};
use reel::recorder::{EventSlice, FilterSpec, QueryReply, Recorder};
use serde_json::json;
use std::sync::Arc;

/// Record three clicks, two console lines and one error, in that order,
/// and return the stopped session's id.
async fn record_mixed_session(recorder: &Recorder, browser: &Arc<ScriptedBrowser>) -> String {
    let id = recorder
        .start_recording(None, &[])
        .await
        .expect("should start recording");
    for _ in 0..3 {
        browser.notify(click_notification("BUTTON"));
    }
    browser.notify(console_notification("first"));
    browser.notify(console_notification("second"));
    browser.notify(js_error_notification("ReferenceError: missing"));
    recorder
        .stop_recording(id.as_str())
        .await
        .expect("should stop recording");
    id.as_str().to_string()
}

/// Shorthand for a type-only filter.
fn types(kinds: &[&str]) -> FilterSpec {
    FilterSpec {
        event_types: Some(kinds.iter().map(|kind| kind.to_string()).collect()),
        ..FilterSpec::default()
    }
}

async fn slice_for(recorder: &Recorder, id: &str, spec: &FilterSpec) -> EventSlice {
    match recorder
        .get_recording(id, spec)
        .await
        .expect("should answer the query")
    {
        QueryReply::Events(slice) => slice,
        QueryReply::Metadata(_) => panic!("a non-empty filter should return events"),
    }
}

#[tokio::test]
async fn test_empty_filter_describes_the_recording() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let (recorder, browser) = scripted_recorder(dir.path());
    let id = record_mixed_session(&recorder, &browser).await;

    let reply = recorder
        .get_recording(&id, &FilterSpec::default())
        .await
        .expect("should load the recording");
    let metadata = match reply {
        QueryReply::Metadata(metadata) => metadata,
        QueryReply::Events(_) => panic!("empty filter should return metadata only"),
    };
    assert_eq!(metadata.session_id, id);
    assert_eq!(metadata.total_event_count, 6);
    assert_eq!(metadata.counts_by_event_type.get("click"), Some(&3));
    assert_eq!(metadata.counts_by_event_type.get("console_log"), Some(&2));
    assert_eq!(metadata.counts_by_event_type.get("js_error"), Some(&1));
    assert!(
        std::path::Path::new(&metadata.file_path).exists(),
        "metadata should point at the recording file"
    );
}

#[tokio::test]
async fn test_type_filter_selects_matching_events() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let (recorder, browser) = scripted_recorder(dir.path());
    let id = record_mixed_session(&recorder, &browser).await;

    let slice = slice_for(&recorder, &id, &types(&["click"])).await;
    assert_eq!(slice.matched_count, 3);
    assert_eq!(slice.total_count, 6);
    assert_eq!(slice.events.len(), 3);
    assert!(slice.events.iter().all(|event| event.kind == "click"));

    // Multiple kinds are OR-combined.
    let slice = slice_for(&recorder, &id, &types(&["console_log", "js_error"])).await;
    assert_eq!(slice.matched_count, 3);
    assert_eq!(slice.events[0].kind, "console_log");
    assert_eq!(slice.events[2].kind, "js_error");
}

#[tokio::test]
async fn test_pagination_windows_the_matched_set() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let (recorder, browser) = scripted_recorder(dir.path());
    let id = record_mixed_session(&recorder, &browser).await;

    // Session order is click, click, click, console, console, error; a
    // window of two starting at offset two straddles the boundary.
    let spec = FilterSpec {
        limit: Some(2),
        offset: Some(2),
        ..FilterSpec::default()
    };
    let slice = slice_for(&recorder, &id, &spec).await;
    assert_eq!(
        slice.matched_count, 6,
        "matched count should ignore pagination"
    );
    assert_eq!(slice.events.len(), 2);
    assert_eq!(slice.events[0].kind, "click");
    assert_eq!(slice.events[1].kind, "console_log");
    assert_eq!(slice.events[1].data["args"][0], json!("first"));

    // Paging past the end is empty but not an error.
    let spec = FilterSpec {
        offset: Some(100),
        ..FilterSpec::default()
    };
    let slice = slice_for(&recorder, &id, &spec).await;
    assert_eq!(slice.matched_count, 6);
    assert!(slice.events.is_empty());
}

#[tokio::test]
async fn test_type_filter_combines_with_pagination() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let (recorder, browser) = scripted_recorder(dir.path());
    let id = record_mixed_session(&recorder, &browser).await;

    let spec = FilterSpec {
        event_types: Some(vec!["click".to_string()]),
        limit: Some(2),
        offset: Some(1),
        ..FilterSpec::default()
    };
    let slice = slice_for(&recorder, &id, &spec).await;
    assert_eq!(slice.matched_count, 3, "pagination should not shrink the match count");
    assert_eq!(slice.events.len(), 2);
    assert!(slice.events.iter().all(|event| event.kind == "click"));
}

#[tokio::test]
async fn test_time_window_uses_real_capture_stamps() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let (recorder, browser) = scripted_recorder(dir.path());
    let id = record_mixed_session(&recorder, &browser).await;

    // Learn the stamped capture times, then cut a [from, to) window
    // across the middle of the recording.
    let all = slice_for(
        &recorder,
        &id,
        &FilterSpec {
            offset: Some(0),
            ..FilterSpec::default()
        },
    )
    .await;
    assert_eq!(all.events.len(), 6);
    let from = all.events[2].timestamp;
    let to = all.events[4].timestamp;
    let expected: Vec<String> = all
        .events
        .iter()
        .filter(|event| event.timestamp >= from && event.timestamp < to)
        .map(|event| event.kind.clone())
        .collect();

    let spec = FilterSpec {
        from_timestamp: Some(from.to_rfc3339()),
        to_timestamp: Some(to.to_rfc3339()),
        ..FilterSpec::default()
    };
    let slice = slice_for(&recorder, &id, &spec).await;
    let got: Vec<String> = slice.events.iter().map(|event| event.kind.clone()).collect();
    assert_eq!(
        got, expected,
        "window should include the from instant and exclude the to instant"
    );
    assert_eq!(slice.matched_count, expected.len());
    assert!(!slice.events.is_empty(), "the event at the from bound qualifies");

    // A window entirely in the future matches nothing.
    let spec = FilterSpec {
        from_timestamp: Some("2099-01-01T00:00:00Z".to_string()),
        ..FilterSpec::default()
    };
    let slice = slice_for(&recorder, &id, &spec).await;
    assert_eq!(slice.matched_count, 0);
    assert!(slice.events.is_empty());
}

#[tokio::test]
async fn test_unknown_event_type_matches_nothing() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let (recorder, browser) = scripted_recorder(dir.path());
    let id = record_mixed_session(&recorder, &browser).await;

    let slice = slice_for(&recorder, &id, &types(&["keypress"])).await;
    assert_eq!(slice.matched_count, 0);
    assert_eq!(slice.total_count, 6);
    assert!(slice.events.is_empty());
}

#[tokio::test]
async fn test_malformed_timestamps_are_rejected() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let (recorder, browser) = scripted_recorder(dir.path());
    let id = record_mixed_session(&recorder, &browser).await;

    for (from, to) in [
        (Some("yesterday"), None),
        (None, Some("2026-13-40T99:00:00Z")),
        (Some("1693526400"), None),
    ] {
        let spec = FilterSpec {
            from_timestamp: from.map(str::to_string),
            to_timestamp: to.map(str::to_string),
            ..FilterSpec::default()
        };
        let err = recorder
            .get_recording(&id, &spec)
            .await
            .expect_err("malformed bound should be rejected");
        assert_eq!(err.kind(), "validation", "bad bound {from:?}/{to:?}");
    }
}

#[tokio::test]
async fn test_slice_reply_shape_over_the_wire() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let (recorder, browser) = scripted_recorder(dir.path());
    let id = record_mixed_session(&recorder, &browser).await;

    let slice = slice_for(&recorder, &id, &types(&["click"])).await;
    assert_eq!(
        slice.filters_applied.event_types,
        Some(vec!["click".to_string()]),
        "reply should echo the criteria that produced it"
    );

    let as_json = serde_json::to_value(&slice).expect("slice should serialize");
    assert_eq!(as_json["session_id"], json!(id));
    assert_eq!(as_json["matched_count"], json!(3));
    assert_eq!(as_json["total_count"], json!(6));
    assert_eq!(as_json["events"][0]["type"], json!("click"));
    assert!(
        as_json["events"][0].get("masked").is_none(),
        "untouched events should omit the masked flag on the wire"
    );
}
