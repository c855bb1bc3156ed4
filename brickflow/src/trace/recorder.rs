//! Trace recorder trait and implementations.

use super::events::{TraceEnter, TraceExit, TraceRecord, TraceSkip};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, Level};
use uuid::Uuid;

/// An error reported by a trace recorder. Logged, never propagated.
#[derive(Debug, Clone, Error)]
#[error("Trace recorder error: {0}")]
pub struct TraceError(pub String);

impl TraceError {
    /// Creates a new trace error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Observer notified around each step.
///
/// Callbacks are synchronous. Implementations receive borrowed events and
/// must clone anything they keep.
#[cfg_attr(test, mockall::automock)]
pub trait TraceRecorder: Send + Sync {
    /// Called after the step's arguments are rendered.
    fn enter(&self, event: &TraceEnter) -> Result<(), TraceError>;

    /// Called when the step finishes, including on failure.
    fn exit(&self, event: &TraceExit) -> Result<(), TraceError>;

    /// Called when the step is skipped by its condition.
    fn skipped(&self, event: &TraceSkip) -> Result<(), TraceError> {
        let _ = event;
        Ok(())
    }
}

/// A recorder that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTraceRecorder;

impl TraceRecorder for NoOpTraceRecorder {
    fn enter(&self, _event: &TraceEnter) -> Result<(), TraceError> {
        Ok(())
    }

    fn exit(&self, _event: &TraceExit) -> Result<(), TraceError> {
        Ok(())
    }
}

/// A recorder that logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingTraceRecorder {
    level: Level,
}

impl Default for LoggingTraceRecorder {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingTraceRecorder {
    /// Creates a logging recorder at the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates an info-level logging recorder.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl TraceRecorder for LoggingTraceRecorder {
    fn enter(&self, event: &TraceEnter) -> Result<(), TraceError> {
        if self.level == Level::INFO {
            info!(
                run_id = %event.run_id,
                instance_id = %event.instance_id,
                brick_id = %event.brick_id,
                branch_path = %event.branch_path,
                "Entering brick"
            );
        } else {
            debug!(
                run_id = %event.run_id,
                instance_id = %event.instance_id,
                brick_id = %event.brick_id,
                branch_path = %event.branch_path,
                rendered_args = %event.rendered_args,
                "Entering brick"
            );
        }
        Ok(())
    }

    fn exit(&self, event: &TraceExit) -> Result<(), TraceError> {
        let error = event.error.as_ref().map(|e| e.message.as_str());
        if self.level == Level::INFO {
            info!(
                run_id = %event.run_id,
                instance_id = %event.instance_id,
                brick_id = %event.brick_id,
                status = %event.status,
                duration_ms = event.duration_ms,
                error,
                "Exited brick"
            );
        } else {
            debug!(
                run_id = %event.run_id,
                instance_id = %event.instance_id,
                brick_id = %event.brick_id,
                branch_path = %event.branch_path,
                status = %event.status,
                duration_ms = event.duration_ms,
                error,
                "Exited brick"
            );
        }
        Ok(())
    }

    fn skipped(&self, event: &TraceSkip) -> Result<(), TraceError> {
        debug!(
            run_id = %event.run_id,
            instance_id = %event.instance_id,
            brick_id = %event.brick_id,
            condition = %event.condition,
            "Skipped brick"
        );
        Ok(())
    }
}

/// A recorder that keeps every event in memory, for tests and debuggers.
#[derive(Debug, Default)]
pub struct CollectingTraceRecorder {
    records: RwLock<Vec<TraceRecord>>,
}

impl CollectingTraceRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all records in emission order.
    #[must_use]
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.read().clone()
    }

    /// Returns all enter events.
    #[must_use]
    pub fn enters(&self) -> Vec<TraceEnter> {
        self.records
            .read()
            .iter()
            .filter_map(|r| match r {
                TraceRecord::Enter(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns all exit events.
    #[must_use]
    pub fn exits(&self) -> Vec<TraceExit> {
        self.records
            .read()
            .iter()
            .filter_map(|r| match r {
                TraceRecord::Exit(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns all skip events.
    #[must_use]
    pub fn skips(&self) -> Vec<TraceSkip> {
        self.records
            .read()
            .iter()
            .filter_map(|r| match r {
                TraceRecord::Skipped(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the records for one step instance.
    #[must_use]
    pub fn records_for(&self, instance_id: Uuid) -> Vec<TraceRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.instance_id() == instance_id)
            .cloned()
            .collect()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Clears all records.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl TraceRecorder for CollectingTraceRecorder {
    fn enter(&self, event: &TraceEnter) -> Result<(), TraceError> {
        self.records.write().push(TraceRecord::Enter(event.clone()));
        Ok(())
    }

    fn exit(&self, event: &TraceExit) -> Result<(), TraceError> {
        self.records.write().push(TraceRecord::Exit(event.clone()));
        Ok(())
    }

    fn skipped(&self, event: &TraceSkip) -> Result<(), TraceError> {
        self.records.write().push(TraceRecord::Skipped(event.clone()));
        Ok(())
    }
}
