//! Assertions over collected traces.

use crate::errors::ErrorKind;
use crate::trace::{CollectingTraceRecorder, TraceRecord};

/// Asserts that the recorder saw enter events for exactly `expected` brick
/// ids, in order.
pub fn assert_entered(recorder: &CollectingTraceRecorder, expected: &[&str]) {
    let actual: Vec<String> = recorder
        .enters()
        .iter()
        .map(|e| e.brick_id.to_string())
        .collect();
    assert_eq!(actual, expected, "Unexpected enter sequence");
}

/// Asserts that every enter has a matching exit.
pub fn assert_balanced(recorder: &CollectingTraceRecorder) {
    let exits = recorder.exits();
    for enter in recorder.enters() {
        assert!(
            exits.iter().any(|e| e.instance_id == enter.instance_id
                && e.branch_path == enter.branch_path),
            "No exit for {} at '{}'",
            enter.brick_id,
            enter.branch_path
        );
    }
}

/// Asserts that some exit failed with `kind`.
pub fn assert_failed_with(recorder: &CollectingTraceRecorder, kind: ErrorKind) {
    let kinds: Vec<ErrorKind> = recorder
        .exits()
        .iter()
        .filter_map(|e| e.error.as_ref().map(|err| err.kind))
        .collect();
    assert!(
        kinds.contains(&kind),
        "Expected a failed exit of kind {kind}, got {kinds:?}"
    );
}

/// Asserts that the recorder saw no events at all.
pub fn assert_no_records(recorder: &CollectingTraceRecorder) {
    let records: Vec<TraceRecord> = recorder.records();
    assert!(records.is_empty(), "Expected no trace records, got {records:?}");
}
