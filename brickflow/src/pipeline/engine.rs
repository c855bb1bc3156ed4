//! Sequential pipeline reduction.
//!
//! Each step is rendered against the context built so far, run, and its
//! output bound under its output key for later steps. The first failure
//! stops the pipeline; recovery only happens inside control-flow bricks.

use super::config::{BrickConfig, Pipeline, RootMode};
use super::options::RunOptions;
use super::validation::InputValidator;
use crate::bricks::{BrickArgs, BrickOptions, RunMeta};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::core::{Root, StepStatus};
use crate::errors::{BrickflowError, InvalidInputError};
use crate::expression::{ExpressionRenderer, RenderOptions, RenderedConfig};
use crate::observability::{BrickLogger, StepTimer};
use crate::registry::{get_brick_registry, BrickRegistry};
use crate::subpipeline::{DetachedRunTracker, PipelineRunner};
use crate::trace::{self, TraceEnter, TraceExit, TraceSkip};
use crate::utils::is_truthy;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

struct EngineInner {
    registry: Arc<BrickRegistry>,
    renderer: ExpressionRenderer,
    validator: InputValidator,
    config: EngineConfig,
    detached: Arc<DetachedRunTracker>,
}

/// Runs pipelines.
///
/// Cheap to clone; clones share the registry, caches and detached-run
/// tracker. The engine holds no per-run state.
#[derive(Clone)]
pub struct PipelineEngine {
    inner: Arc<EngineInner>,
}

/// Builder for [`PipelineEngine`].
#[derive(Debug, Default)]
pub struct EngineBuilder {
    registry: Option<Arc<BrickRegistry>>,
    config: EngineConfig,
    detached: Option<Arc<DetachedRunTracker>>,
}

impl EngineBuilder {
    /// Sets the registry. Defaults to the process-wide registry.
    #[must_use]
    pub fn registry(mut self, registry: Arc<BrickRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the engine configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the tracker that owns detached runs.
    #[must_use]
    pub fn detached_tracker(mut self, tracker: Arc<DetachedRunTracker>) -> Self {
        self.detached = Some(tracker);
        self
    }

    /// Builds the engine.
    #[must_use]
    pub fn build(self) -> PipelineEngine {
        PipelineEngine {
            inner: Arc::new(EngineInner {
                registry: self.registry.unwrap_or_else(get_brick_registry),
                renderer: ExpressionRenderer::new(),
                validator: InputValidator::new(),
                config: self.config,
                detached: self.detached.unwrap_or_default(),
            }),
        }
    }
}

enum StepOutcome {
    Skipped,
    Completed(Value),
}

/// Per-step bookkeeping shared by the success and failure paths.
struct StepScope<'a> {
    step: &'a BrickConfig,
    options: &'a RunOptions,
    logger: BrickLogger,
    timer: StepTimer,
    status: StepStatus,
}

impl<'a> StepScope<'a> {
    fn new(step: &'a BrickConfig, options: &'a RunOptions) -> Self {
        Self {
            step,
            options,
            logger: options
                .logger
                .child(&step.id)
                .with_instance(step.instance_id)
                .with_branch_path(options.branch_path.clone()),
            timer: StepTimer::start(),
            status: StepStatus::Pending,
        }
    }

    fn advance(&mut self) {
        self.status = self.status.advance();
    }

    /// Records the failure and hands the error back for propagation.
    fn fail(&mut self, err: BrickflowError) -> BrickflowError {
        let during = std::mem::replace(&mut self.status, StepStatus::Failed);
        self.logger
            .warn(format!("Brick failed while {during}: {err}"));
        let exit = TraceExit::failure(
            self.options.run_id,
            self.step.instance_id,
            self.step.id.clone(),
            self.options.branch_path.clone(),
            err.to_trace_info(),
            self.timer.elapsed_ms(),
        );
        trace::notify(self.options.tracer.as_ref(), "exit", |t| t.exit(&exit));
        err
    }
}

impl Default for PipelineEngine {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for PipelineEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineEngine")
            .field("registry", &self.inner.registry)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl PipelineEngine {
    /// Creates an engine over `registry` with the default configuration.
    #[must_use]
    pub fn new(registry: Arc<BrickRegistry>) -> Self {
        Self::builder().registry(registry).build()
    }

    /// Starts building an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<BrickRegistry> {
        &self.inner.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Returns the renderer.
    #[must_use]
    pub fn renderer(&self) -> &ExpressionRenderer {
        &self.inner.renderer
    }

    /// Returns the tracker owning detached runs.
    #[must_use]
    pub fn detached(&self) -> &Arc<DetachedRunTracker> {
        &self.inner.detached
    }

    /// Returns the render options every step uses.
    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        self.inner.config.render_options()
    }

    /// Runs `pipeline` against `context`.
    ///
    /// Returns the output of the last step that ran, or `{}` if every step
    /// was skipped or the pipeline is empty. The first failing step's error
    /// is returned after its `exit` trace event.
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        context: Context,
        options: RunOptions,
    ) -> Result<Value, BrickflowError> {
        options
            .logger
            .debug(format!("Running pipeline with {} step(s)", pipeline.len()));

        let mut context = context;
        let mut output = Value::Object(Map::new());
        for step in pipeline {
            if let StepOutcome::Completed(value) = self.run_step(step, &context, &options).await? {
                if let Some(key) = &step.output_key {
                    context = context.with_output(key, value.clone());
                }
                output = value;
            }
        }
        Ok(output)
    }

    async fn run_step(
        &self,
        step: &BrickConfig,
        context: &Context,
        options: &RunOptions,
    ) -> Result<StepOutcome, BrickflowError> {
        let mut scope = StepScope::new(step, options);
        let renderer = &self.inner.renderer;
        let render_options = self.render_options();
        scope.advance();

        if let Some(condition) = &step.condition {
            let value = renderer
                .render_field(condition, context, render_options, "if")
                .map_err(|e| scope.fail(e.into()))?;
            if !is_truthy(&value) {
                scope.status = StepStatus::Skipped;
                scope.logger.debug("Condition is falsy, skipping brick");
                let event = TraceSkip {
                    run_id: options.run_id,
                    instance_id: step.instance_id,
                    brick_id: step.id.clone(),
                    branch_path: options.branch_path.clone(),
                    condition: value,
                    timestamp: Utc::now(),
                };
                trace::notify(options.tracer.as_ref(), "skipped", |t| t.skipped(&event));
                return Ok(StepOutcome::Skipped);
            }
        }

        let root = self
            .select_root(step, context, options, render_options)
            .map_err(|e| scope.fail(e))?;
        let rendered = renderer
            .render_config(&step.config, context, render_options)
            .map_err(|e| scope.fail(e.into()))?;

        let enter = TraceEnter::new(
            options.run_id,
            step.instance_id,
            step.id.clone(),
            options.branch_path.clone(),
            Value::Object(rendered.args.clone()),
        )
        .with_label(step.label.clone());
        trace::notify(options.tracer.as_ref(), "enter", |t| t.enter(&enter));

        match self.invoke(&mut scope, rendered, root, context).await {
            Ok(output) => {
                scope.advance();
                let exit = TraceExit::success(
                    options.run_id,
                    step.instance_id,
                    step.id.clone(),
                    options.branch_path.clone(),
                    output.clone(),
                    scope.timer.elapsed_ms(),
                );
                trace::notify(options.tracer.as_ref(), "exit", |t| t.exit(&exit));
                Ok(StepOutcome::Completed(output))
            }
            Err(err) => Err(scope.fail(err)),
        }
    }

    fn select_root(
        &self,
        step: &BrickConfig,
        context: &Context,
        options: &RunOptions,
        render_options: RenderOptions,
    ) -> Result<Root, BrickflowError> {
        match step.root_mode {
            RootMode::Inherit => Ok(options.root.clone()),
            RootMode::Document => Ok(Root::Document),
            RootMode::Element => {
                let Some(expr) = &step.root else {
                    return Err(InvalidInputError::field(
                        "root",
                        "is required when rootMode is 'element'",
                    )
                    .into());
                };
                let reference = self
                    .inner
                    .renderer
                    .render_field(expr, context, render_options, "root")?;
                Ok(options.element_resolver.resolve(&options.root, &reference)?)
            }
        }
    }

    async fn invoke(
        &self,
        scope: &mut StepScope<'_>,
        rendered: RenderedConfig,
        root: Root,
        context: &Context,
    ) -> Result<Value, BrickflowError> {
        let step = scope.step;
        let brick = self.inner.registry.lookup(&step.id)?;
        let schema = brick.input_schema();

        for missing in rendered.missing {
            if InputValidator::missing_is_error(&schema, &missing.field) {
                return Err(missing.into_error().into());
            }
            scope.logger.debug(format!(
                "Omitting optional field '{}': variable {} not found",
                missing.field, missing.path
            ));
        }

        scope.advance();
        let mut args = rendered.args;
        InputValidator::apply_defaults(&schema, &mut args);
        let args = Value::Object(args);
        if self.inner.config.validate_inputs {
            self.inner.validator.validate(&step.id, &schema, &args)?;
        }
        let args = BrickArgs::from_value(args)?;

        scope.advance();
        let meta = RunMeta {
            run_id: scope.options.run_id,
            instance_id: step.instance_id,
            brick_id: step.id.clone(),
            branch_path: scope.options.branch_path.clone(),
        };
        let options = BrickOptions {
            root: root.clone(),
            context: context.clone(),
            logger: scope.logger.clone(),
            runner: PipelineRunner::new(
                self.clone(),
                context.clone(),
                scope.options.clone().with_root(root),
                meta.clone(),
                scope.logger.clone(),
            ),
            meta,
        };
        scope.logger.debug("Running brick");
        brick.run(args, &options).await
    }
}
