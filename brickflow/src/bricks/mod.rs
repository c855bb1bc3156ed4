//! The brick contract.
//!
//! Bricks are the units of work a pipeline invokes. The engine renders a
//! step's config into [`BrickArgs`], validates them against the brick's
//! input schema and calls [`Brick::run`].

mod args;
pub mod control_flow;

pub use args::BrickArgs;

use crate::context::Context;
use crate::core::{BranchPath, BrickId, BrickKind, Root};
use crate::errors::BrickflowError;
use crate::observability::BrickLogger;
use crate::subpipeline::PipelineRunner;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Debug;
use uuid::Uuid;

/// A unit of work a pipeline step can invoke.
///
/// Bricks are registered once and shared across runs, so implementations
/// keep per-invocation state in locals, not in `self`.
#[async_trait]
pub trait Brick: Send + Sync + Debug {
    /// Returns the registry id.
    fn id(&self) -> &BrickId;

    /// Returns a human-readable name.
    fn name(&self) -> &str {
        self.id().as_str()
    }

    /// Returns the capability kind.
    fn kind(&self) -> BrickKind {
        BrickKind::Transformer
    }

    /// Returns the JSON Schema the rendered arguments must satisfy.
    ///
    /// Top-level `properties.<name>.default` values fill in missing
    /// arguments before validation.
    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    /// Returns true if the brick has no side effects.
    fn is_pure(&self) -> bool {
        false
    }

    /// Returns true if the brick uses the root it is given.
    fn is_root_aware(&self) -> bool {
        false
    }

    /// Runs the brick.
    async fn run(&self, args: BrickArgs, options: &BrickOptions) -> Result<Value, BrickflowError>;
}

/// Identifies the step a brick is running for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMeta {
    /// The top-level run.
    pub run_id: Uuid,
    /// The authored step.
    pub instance_id: Uuid,
    /// The brick being run.
    pub brick_id: BrickId,
    /// Branches taken to reach the step.
    pub branch_path: BranchPath,
}

/// Everything a brick receives besides its arguments.
#[derive(Debug, Clone)]
pub struct BrickOptions {
    /// The root the step runs against.
    pub root: Root,
    /// The context the step's arguments were rendered against.
    pub context: Context,
    /// Logger scoped to the step.
    pub logger: BrickLogger,
    /// Runs nested pipelines on behalf of the brick.
    pub runner: PipelineRunner,
    /// Step identity.
    pub meta: RunMeta,
}

/// Signature of the closure behind a [`FnBrick`].
pub type BrickFn = dyn Fn(BrickArgs, &BrickOptions) -> Result<Value, BrickflowError> + Send + Sync;

/// A brick backed by a synchronous closure.
pub struct FnBrick {
    id: BrickId,
    kind: BrickKind,
    schema: Value,
    pure: bool,
    func: Box<BrickFn>,
}

impl FnBrick {
    /// Creates a new closure-backed transformer brick.
    pub fn new<F>(id: BrickId, func: F) -> Self
    where
        F: Fn(BrickArgs, &BrickOptions) -> Result<Value, BrickflowError> + Send + Sync + 'static,
    {
        Self {
            id,
            kind: BrickKind::Transformer,
            schema: json!({"type": "object"}),
            pure: false,
            func: Box::new(func),
        }
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    /// Sets the capability kind.
    #[must_use]
    pub fn with_kind(mut self, kind: BrickKind) -> Self {
        self.kind = kind;
        self
    }

    /// Marks the brick as pure.
    #[must_use]
    pub fn pure(mut self) -> Self {
        self.pure = true;
        self
    }
}

impl Debug for FnBrick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnBrick")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Brick for FnBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        self.kind
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    fn is_pure(&self) -> bool {
        self.pure
    }

    async fn run(&self, args: BrickArgs, options: &BrickOptions) -> Result<Value, BrickflowError> {
        (self.func)(args, options)
    }
}
