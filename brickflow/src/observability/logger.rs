//! Scoped logger handed to bricks.

use crate::core::{BranchPath, BrickId};
use uuid::Uuid;

macro_rules! scoped_event {
    ($level:ident, $logger:expr, $message:expr) => {
        tracing::$level!(
            run_id = %$logger.run_id,
            brick_id = $logger.brick_id.as_ref().map(BrickId::as_str),
            instance_id = $logger.instance_id.map(::tracing::field::display),
            branch_path = %$logger.branch_path,
            "{}",
            $message
        )
    };
}

/// A logger carrying run, brick and branch fields on every event.
///
/// Cheap to clone. Engines derive one per step with [`BrickLogger::child`].
#[derive(Debug, Clone, Default)]
pub struct BrickLogger {
    run_id: Uuid,
    brick_id: Option<BrickId>,
    instance_id: Option<Uuid>,
    branch_path: BranchPath,
}

impl BrickLogger {
    /// Creates a logger for a run.
    #[must_use]
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            ..Self::default()
        }
    }

    /// Derives a logger scoped to a brick.
    #[must_use]
    pub fn child(&self, brick_id: &BrickId) -> Self {
        Self {
            brick_id: Some(brick_id.clone()),
            ..self.clone()
        }
    }

    /// Sets the step instance.
    #[must_use]
    pub fn with_instance(mut self, instance_id: Uuid) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    /// Sets the branch path.
    #[must_use]
    pub fn with_branch_path(mut self, branch_path: BranchPath) -> Self {
        self.branch_path = branch_path;
        self
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the brick the logger is scoped to.
    #[must_use]
    pub fn brick_id(&self) -> Option<&BrickId> {
        self.brick_id.as_ref()
    }

    /// Logs at debug level.
    pub fn debug(&self, message: impl AsRef<str>) {
        scoped_event!(debug, self, message.as_ref());
    }

    /// Logs at info level.
    pub fn info(&self, message: impl AsRef<str>) {
        scoped_event!(info, self, message.as_ref());
    }

    /// Logs at warn level.
    pub fn warn(&self, message: impl AsRef<str>) {
        scoped_event!(warn, self, message.as_ref());
    }

    /// Logs at error level.
    pub fn error(&self, message: impl AsRef<str>) {
        scoped_event!(error, self, message.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Branch;

    #[test]
    fn test_child_keeps_run_scope() {
        let run_id = Uuid::now_v7();
        let root = BrickLogger::new(run_id);
        assert_eq!(root.brick_id(), None);

        let brick = BrickId::parse("@test/echo").unwrap();
        let child = root
            .child(&brick)
            .with_instance(Uuid::new_v4())
            .with_branch_path(BranchPath::new().push(Branch::new("branch", 0)));

        assert_eq!(child.run_id(), run_id);
        assert_eq!(child.brick_id(), Some(&brick));
        child.debug("hello");
        child.info("hello");
        child.warn("hello");
        child.error("hello");
    }
}
