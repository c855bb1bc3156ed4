//! Nested pipeline execution on behalf of control-flow bricks.

mod detached;
mod runner;

pub use detached::{
    DetachedRunFailure, DetachedRunInfo, DetachedRunTracker, FailureHook, DEFAULT_FAILURE_CAPACITY,
};
pub use runner::PipelineRunner;
