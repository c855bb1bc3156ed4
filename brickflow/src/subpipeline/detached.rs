//! Tracking for fire-and-forget pipeline runs.

use crate::core::{BranchPath, BrickId};
use crate::errors::{BrickflowError, ErrorInfo, ErrorKind};
use crate::observability::BrickLogger;
use crate::utils::iso_timestamp;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Information about a detached run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetachedRunInfo {
    /// Tracking id of the detached run.
    pub id: Uuid,
    /// The run that spawned it.
    pub run_id: Uuid,
    /// The brick that spawned it.
    pub brick_id: BrickId,
    /// The step that spawned it.
    pub instance_id: Uuid,
    /// Branch path of the detached body.
    pub branch_path: BranchPath,
    /// When it was spawned (ISO 8601).
    pub spawned_at: String,
}

impl DetachedRunInfo {
    /// Creates info for a new detached run.
    #[must_use]
    pub fn new(run_id: Uuid, brick_id: BrickId, instance_id: Uuid, branch_path: BranchPath) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            brick_id,
            instance_id,
            branch_path,
            spawned_at: iso_timestamp(),
        }
    }
}

/// A detached run that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetachedRunFailure {
    /// The failed run.
    pub info: DetachedRunInfo,
    /// What went wrong.
    pub error: ErrorInfo,
    /// True if the body panicked rather than returning an error.
    pub panicked: bool,
}

/// Callback invoked for every detached failure.
pub type FailureHook = Arc<dyn Fn(&DetachedRunFailure) + Send + Sync>;

/// Number of failures a tracker keeps unless configured otherwise.
pub const DEFAULT_FAILURE_CAPACITY: usize = 256;

/// Owns detached runs so their failures are always observed.
///
/// Each failure is logged, passed to the optional hook and kept for
/// [`DetachedRunTracker::failures`]. Only the most recent failures are kept
/// (see [`DetachedRunTracker::with_failure_capacity`]); hosts that need all
/// of them should install a hook.
pub struct DetachedRunTracker {
    active: RwLock<HashMap<Uuid, DetachedRunInfo>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    failures: RwLock<VecDeque<DetachedRunFailure>>,
    failure_capacity: usize,
    hook: RwLock<Option<FailureHook>>,
}

impl Default for DetachedRunTracker {
    fn default() -> Self {
        Self {
            active: RwLock::default(),
            handles: Mutex::default(),
            failures: RwLock::default(),
            failure_capacity: DEFAULT_FAILURE_CAPACITY,
            hook: RwLock::default(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "detached run panicked".to_string())
}

impl DetachedRunTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many failures are kept. The oldest is dropped first.
    #[must_use]
    pub fn with_failure_capacity(mut self, capacity: usize) -> Self {
        self.failure_capacity = capacity;
        self
    }

    /// Sets the failure hook.
    #[must_use]
    pub fn with_failure_hook(self, hook: FailureHook) -> Self {
        *self.hook.write() = Some(hook);
        self
    }

    /// Replaces the failure hook.
    pub fn set_failure_hook(&self, hook: FailureHook) {
        *self.hook.write() = Some(hook);
    }

    /// Spawns `run` on the tokio runtime and tracks it.
    pub fn spawn<F>(self: &Arc<Self>, info: DetachedRunInfo, logger: BrickLogger, run: F)
    where
        F: Future<Output = Result<serde_json::Value, BrickflowError>> + Send + 'static,
    {
        let id = info.id;
        self.active.write().insert(id, info);

        let tracker = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let result = AssertUnwindSafe(run).catch_unwind().await;
            let Some(info) = tracker.active.write().remove(&id) else {
                return;
            };
            match result {
                Ok(Ok(_)) => logger.debug("Detached run completed"),
                Ok(Err(err)) => {
                    logger.error(format!("Detached run failed: {err}"));
                    tracker.record(DetachedRunFailure {
                        info,
                        error: err.to_trace_info(),
                        panicked: false,
                    });
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    logger.error(format!("Detached run panicked: {message}"));
                    tracker.record(DetachedRunFailure {
                        info,
                        error: ErrorInfo {
                            kind: ErrorKind::Unexpected,
                            message,
                            field: None,
                        },
                        panicked: true,
                    });
                }
            }
        });

        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    fn record(&self, failure: DetachedRunFailure) {
        let hook = self.hook.read().clone();
        if let Some(hook) = hook {
            if std::panic::catch_unwind(AssertUnwindSafe(|| hook(&failure))).is_err() {
                tracing::warn!(detached_run_id = %failure.info.id, "Detached failure hook panicked");
            }
        }
        if self.failure_capacity == 0 {
            return;
        }
        let mut failures = self.failures.write();
        while failures.len() >= self.failure_capacity {
            failures.pop_front();
        }
        failures.push_back(failure);
    }

    /// Returns the retained failures, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<DetachedRunFailure> {
        self.failures.read().iter().cloned().collect()
    }

    /// Returns the runs still in flight.
    #[must_use]
    pub fn active(&self) -> Vec<DetachedRunInfo> {
        self.active.read().values().cloned().collect()
    }

    /// Returns the number of runs still in flight.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.read().len()
    }

    /// Waits until every tracked run, including runs spawned while
    /// waiting, has finished.
    pub async fn wait_all(&self) {
        loop {
            let handles: Vec<_> = std::mem::take(&mut *self.handles.lock());
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                let _ = handle.await;
            }
        }
    }

    /// Clears recorded failures.
    pub fn clear_failures(&self) {
        self.failures.write().clear();
    }
}

impl std::fmt::Debug for DetachedRunTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetachedRunTracker")
            .field("active", &self.active_count())
            .field("failures", &self.failures.read().len())
            .finish_non_exhaustive()
    }
}
