//! Trace event payloads.

use crate::core::{BranchPath, BrickId, StepStatus};
use crate::errors::ErrorInfo;
use crate::utils::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted once a step's arguments are rendered, before the brick runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEnter {
    /// The top-level run.
    pub run_id: Uuid,
    /// The authored step.
    pub instance_id: Uuid,
    /// The brick being invoked.
    pub brick_id: BrickId,
    /// Display label of the step, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Branches taken to reach this step.
    pub branch_path: BranchPath,
    /// The rendered arguments.
    pub rendered_args: serde_json::Value,
    /// When the event was created.
    pub timestamp: Timestamp,
}

impl TraceEnter {
    /// Creates an enter event stamped with the current time.
    #[must_use]
    pub fn new(
        run_id: Uuid,
        instance_id: Uuid,
        brick_id: BrickId,
        branch_path: BranchPath,
        rendered_args: serde_json::Value,
    ) -> Self {
        Self {
            run_id,
            instance_id,
            brick_id,
            label: None,
            branch_path,
            rendered_args,
            timestamp: Utc::now(),
        }
    }

    /// Sets the step label.
    #[must_use]
    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }
}

/// Emitted when a step finishes, successfully or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceExit {
    /// The top-level run.
    pub run_id: Uuid,
    /// The authored step.
    pub instance_id: Uuid,
    /// The brick that was invoked.
    pub brick_id: BrickId,
    /// Branches taken to reach this step.
    pub branch_path: BranchPath,
    /// Terminal status, `Succeeded` or `Failed`.
    pub status: StepStatus,
    /// The brick output on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// The error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// Wall time from the start of the step.
    pub duration_ms: f64,
    /// When the event was created.
    pub timestamp: Timestamp,
}

impl TraceExit {
    /// Creates a success exit event.
    #[must_use]
    pub fn success(
        run_id: Uuid,
        instance_id: Uuid,
        brick_id: BrickId,
        branch_path: BranchPath,
        output: serde_json::Value,
        duration_ms: f64,
    ) -> Self {
        Self {
            run_id,
            instance_id,
            brick_id,
            branch_path,
            status: StepStatus::Succeeded,
            output: Some(output),
            error: None,
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    /// Creates a failure exit event.
    #[must_use]
    pub fn failure(
        run_id: Uuid,
        instance_id: Uuid,
        brick_id: BrickId,
        branch_path: BranchPath,
        error: ErrorInfo,
        duration_ms: f64,
    ) -> Self {
        Self {
            run_id,
            instance_id,
            brick_id,
            branch_path,
            status: StepStatus::Failed,
            output: None,
            error: Some(error),
            duration_ms,
            timestamp: Utc::now(),
        }
    }

    /// Returns true if the step succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Succeeded
    }
}

/// Emitted instead of `enter`/`exit` when a step's condition is falsy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSkip {
    /// The top-level run.
    pub run_id: Uuid,
    /// The authored step.
    pub instance_id: Uuid,
    /// The brick that would have run.
    pub brick_id: BrickId,
    /// Branches taken to reach this step.
    pub branch_path: BranchPath,
    /// The rendered condition value.
    pub condition: serde_json::Value,
    /// When the event was created.
    pub timestamp: Timestamp,
}

/// Any trace event, as stored by collecting recorders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceRecord {
    /// See [`TraceEnter`].
    Enter(TraceEnter),
    /// See [`TraceExit`].
    Exit(TraceExit),
    /// See [`TraceSkip`].
    Skipped(TraceSkip),
}

impl TraceRecord {
    /// Returns the step instance the record belongs to.
    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        match self {
            Self::Enter(e) => e.instance_id,
            Self::Exit(e) => e.instance_id,
            Self::Skipped(e) => e.instance_id,
        }
    }

    /// Returns the branch path the record was emitted under.
    #[must_use]
    pub fn branch_path(&self) -> &BranchPath {
        match self {
            Self::Enter(e) => &e.branch_path,
            Self::Exit(e) => &e.branch_path,
            Self::Skipped(e) => &e.branch_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{BrickflowError, BusinessError};
    use serde_json::json;

    #[test]
    fn test_exit_serialization() {
        let error = BrickflowError::from(BusinessError::new("nope")).to_trace_info();
        let exit = TraceExit::failure(
            Uuid::now_v7(),
            Uuid::new_v4(),
            BrickId::parse("@test/fail").unwrap(),
            BranchPath::new(),
            error,
            1.5,
        );
        assert!(!exit.is_success());

        let json = serde_json::to_value(TraceRecord::Exit(exit)).unwrap();
        assert_eq!(json["type"], "exit");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"]["message"], "nope");
        assert_eq!(json["brickId"], "@test/fail");
        assert!(json.get("output").is_none());
    }

    #[test]
    fn test_enter_carries_label() {
        let enter = TraceEnter::new(
            Uuid::now_v7(),
            Uuid::new_v4(),
            BrickId::parse("@test/echo").unwrap(),
            BranchPath::new(),
            json!({"message": "hi"}),
        )
        .with_label(Some("Say hi".to_string()));

        let json = serde_json::to_value(&enter).unwrap();
        assert_eq!(json["label"], "Say hi");
        assert_eq!(json["renderedArgs"]["message"], "hi");
    }
}
