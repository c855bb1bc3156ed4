//! Brick kind and step status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The capability a brick declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrickKind {
    /// Performs a side effect; its output is usually empty.
    Effect,
    /// Maps its arguments to a new value.
    #[default]
    Transformer,
    /// Reads data from the page or an integration.
    Reader,
}

impl fmt::Display for BrickKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Effect => write!(f, "effect"),
            Self::Transformer => write!(f, "transformer"),
            Self::Reader => write!(f, "reader"),
        }
    }
}

/// The lifecycle state of a single pipeline step.
///
/// `Pending -> Rendering -> Validating -> Running -> Succeeded | Failed`,
/// or `Pending -> Skipped` when the step's condition is falsy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not started.
    #[default]
    Pending,
    /// Rendering the condition, root and arguments.
    Rendering,
    /// Checking rendered arguments against the brick's schema.
    Validating,
    /// The brick is executing.
    Running,
    /// The brick returned a value.
    Succeeded,
    /// Rendering, validation or the brick itself failed.
    Failed,
    /// The step's condition was falsy.
    Skipped,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Rendering => write!(f, "rendering"),
            Self::Validating => write!(f, "validating"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl StepStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }

    /// Returns the state that follows this one on the success path.
    #[must_use]
    pub fn advance(self) -> Self {
        match self {
            Self::Pending => Self::Rendering,
            Self::Rendering => Self::Validating,
            Self::Validating => Self::Running,
            Self::Running => Self::Succeeded,
            terminal => terminal,
        }
    }
}
