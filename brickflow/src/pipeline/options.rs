//! Per-run options.

use crate::core::{BranchPath, ElementResolver, ReferenceResolver, Root};
use crate::observability::BrickLogger;
use crate::trace::{NoOpTraceRecorder, TraceRecorder};
use crate::utils::generate_run_id;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Options for one call to [`PipelineEngine::run`](super::PipelineEngine::run).
///
/// Nested runs derive their options from the enclosing step's, with a longer
/// branch path.
#[derive(Clone)]
pub struct RunOptions {
    /// Identifies the top-level run in traces and logs.
    pub run_id: Uuid,
    /// The root steps run against unless they select another.
    pub root: Root,
    /// Branches taken to reach this pipeline; empty at the top level.
    pub branch_path: BranchPath,
    /// Receives step trace events.
    pub tracer: Arc<dyn TraceRecorder>,
    /// Base logger; each step derives a child from it.
    pub logger: BrickLogger,
    /// Resolves `rootMode: element` references.
    pub element_resolver: Arc<dyn ElementResolver>,
}

impl Default for RunOptions {
    fn default() -> Self {
        let run_id = generate_run_id();
        Self {
            run_id,
            root: Root::Document,
            branch_path: BranchPath::new(),
            tracer: Arc::new(NoOpTraceRecorder),
            logger: BrickLogger::new(run_id),
            element_resolver: Arc::new(ReferenceResolver),
        }
    }
}

impl RunOptions {
    /// Creates options for a fresh top-level run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the run id; the logger is rescoped to it.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self.logger = BrickLogger::new(run_id);
        self
    }

    /// Sets the root.
    #[must_use]
    pub fn with_root(mut self, root: Root) -> Self {
        self.root = root;
        self
    }

    /// Sets the branch path.
    #[must_use]
    pub fn with_branch_path(mut self, branch_path: BranchPath) -> Self {
        self.branch_path = branch_path;
        self
    }

    /// Sets the trace recorder.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<dyn TraceRecorder>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Sets the base logger.
    #[must_use]
    pub fn with_logger(mut self, logger: BrickLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Sets the element resolver.
    #[must_use]
    pub fn with_element_resolver(mut self, resolver: Arc<dyn ElementResolver>) -> Self {
        self.element_resolver = resolver;
        self
    }

    /// Returns the nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.branch_path.depth()
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("run_id", &self.run_id)
            .field("root", &self.root)
            .field("branch_path", &self.branch_path)
            .field("element_resolver", &self.element_resolver)
            .finish_non_exhaustive()
    }
}
