//! Step tracing.
//!
//! The engine reports every step to a [`TraceRecorder`]: `enter` once the
//! arguments are rendered, `exit` with the output or error, and `skipped`
//! when a condition is falsy. Recorders are observers only; their failures
//! never reach the pipeline.

mod events;
mod recorder;

pub use events::{TraceEnter, TraceExit, TraceRecord, TraceSkip};
#[cfg(test)]
pub use recorder::MockTraceRecorder;
pub use recorder::{
    CollectingTraceRecorder, LoggingTraceRecorder, NoOpTraceRecorder, TraceError, TraceRecorder,
};

use std::panic::{catch_unwind, AssertUnwindSafe};

/// Invokes a recorder callback, logging and discarding errors and panics.
pub(crate) fn notify<F>(recorder: &dyn TraceRecorder, event: &'static str, f: F)
where
    F: FnOnce(&dyn TraceRecorder) -> Result<(), TraceError>,
{
    match catch_unwind(AssertUnwindSafe(|| f(recorder))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::warn!(trace_event = event, error = %err, "Trace recorder failed");
        }
        Err(_) => {
            tracing::warn!(trace_event = event, "Trace recorder panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BranchPath, BrickId};
    use serde_json::json;
    use uuid::Uuid;

    fn enter() -> TraceEnter {
        TraceEnter::new(
            Uuid::now_v7(),
            Uuid::new_v4(),
            BrickId::parse("@test/echo").unwrap(),
            BranchPath::new(),
            json!({}),
        )
    }

    #[derive(Debug)]
    struct PanickingRecorder;

    impl TraceRecorder for PanickingRecorder {
        fn enter(&self, _event: &TraceEnter) -> Result<(), TraceError> {
            panic!("recorder bug");
        }

        fn exit(&self, _event: &TraceExit) -> Result<(), TraceError> {
            Ok(())
        }
    }

    #[test]
    fn test_notify_swallows_errors() {
        let mut mock = MockTraceRecorder::new();
        mock.expect_enter()
            .times(1)
            .returning(|_| Err(TraceError::new("disk full")));

        let event = enter();
        notify(&mock, "enter", |r| r.enter(&event));
    }

    #[test]
    fn test_notify_swallows_panics() {
        let event = enter();
        notify(&PanickingRecorder, "enter", |r| r.enter(&event));
    }
}
