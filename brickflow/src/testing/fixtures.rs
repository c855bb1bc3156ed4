//! Engine harness for brick and pipeline tests.

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::mocks::{EchoBrick, FailingBrick, ECHO_BRICK_ID, FAILING_BRICK_ID};
use crate::bricks::{BrickOptions, RunMeta};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::core::BrickId;
use crate::errors::BrickflowError;
use crate::expression::Expression;
use crate::pipeline::{BrickConfig, Pipeline, PipelineEngine, RunOptions};
use crate::registry::BrickRegistry;
use crate::subpipeline::PipelineRunner;
use crate::trace::CollectingTraceRecorder;
use crate::utils::{generate_run_id, generate_uuid};

/// An engine wired to a private registry and a collecting recorder.
///
/// The registry holds the built-in bricks, an [`EchoBrick`] and a
/// [`FailingBrick`] under `@test/fail` that fails with
/// `Intentional failure`.
#[derive(Debug)]
pub struct TestEngine {
    /// The engine under test.
    pub engine: PipelineEngine,
    /// The engine's registry; register extra mocks here.
    pub registry: Arc<BrickRegistry>,
    /// Receives every trace event of runs started through the harness.
    pub recorder: Arc<CollectingTraceRecorder>,
    /// The registered echo brick.
    pub echo: EchoBrick,
    run_id: Uuid,
}

impl TestEngine {
    /// Creates a harness with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates a harness with `config`.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let registry = Arc::new(BrickRegistry::with_builtins());
        let echo = EchoBrick::new();
        registry.register_one(echo.clone());
        registry.register_one(FailingBrick::new(FAILING_BRICK_ID, "Intentional failure"));

        let engine = PipelineEngine::builder()
            .registry(Arc::clone(&registry))
            .config(config)
            .build();

        Self {
            engine,
            registry,
            recorder: Arc::new(CollectingTraceRecorder::new()),
            echo,
            run_id: generate_run_id(),
        }
    }

    /// Returns the run id every harness run uses.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns an empty context.
    #[must_use]
    pub fn context(&self) -> Context {
        Context::new()
    }

    /// Returns top-level run options traced by [`Self::recorder`].
    #[must_use]
    pub fn options(&self) -> RunOptions {
        RunOptions::new()
            .with_run_id(self.run_id)
            .with_tracer(self.recorder.clone())
    }

    /// Returns a step that echoes `message`.
    #[must_use]
    pub fn echo_step(&self, message: Expression) -> BrickConfig {
        BrickConfig::for_brick(BrickId::from_static(ECHO_BRICK_ID)).with_arg("message", message)
    }

    /// Runs `pipeline` with `input` bound as `@input`.
    pub async fn run(&self, pipeline: Pipeline, input: Value) -> Result<Value, BrickflowError> {
        self.run_with_context(pipeline, self.context().with_input(input)).await
    }

    /// Runs `pipeline` against `context`.
    pub async fn run_with_context(
        &self,
        pipeline: Pipeline,
        context: Context,
    ) -> Result<Value, BrickflowError> {
        self.engine.run(&pipeline, context, self.options()).await
    }

    /// Builds the options a top-level step for `brick_id` would receive.
    #[must_use]
    pub fn brick_options(&self, brick_id: &BrickId) -> BrickOptions {
        self.brick_options_with_context(brick_id, self.context())
    }

    /// Like [`Self::brick_options`], with the step rendered against
    /// `context`.
    #[must_use]
    pub fn brick_options_with_context(&self, brick_id: &BrickId, context: Context) -> BrickOptions {
        let options = self.options();
        let instance_id = generate_uuid();
        let logger = options.logger.child(brick_id).with_instance(instance_id);
        let meta = RunMeta {
            run_id: options.run_id,
            instance_id,
            brick_id: brick_id.clone(),
            branch_path: options.branch_path.clone(),
        };

        BrickOptions {
            root: options.root.clone(),
            context: context.clone(),
            logger: logger.clone(),
            runner: PipelineRunner::new(self.engine.clone(), context, options, meta.clone(), logger),
            meta,
        }
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}
