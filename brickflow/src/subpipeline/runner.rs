//! Re-entrant pipeline runner handed to bricks.

use crate::bricks::RunMeta;
use crate::config::EngineConfig;
use crate::context::Context;
use crate::core::{Branch, BranchPath, Root};
use crate::errors::{BrickflowError, BusinessError, InputRenderError};
use crate::expression::Expression;
use crate::observability::BrickLogger;
use crate::pipeline::{Pipeline, PipelineEngine, RunOptions};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use uuid::Uuid;

use super::detached::DetachedRunInfo;

/// Runs nested pipelines in the scope of the step that owns it.
///
/// Nested runs inherit the step's context, root, tracer and run id, and push
/// one [`Branch`] onto the branch path. Bindings added inside a nested run
/// are discarded when it returns.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    engine: PipelineEngine,
    context: Context,
    options: RunOptions,
    origin: RunMeta,
    logger: BrickLogger,
}

impl PipelineRunner {
    pub(crate) fn new(
        engine: PipelineEngine,
        context: Context,
        options: RunOptions,
        origin: RunMeta,
        logger: BrickLogger,
    ) -> Self {
        Self {
            engine,
            context,
            options,
            origin,
            logger,
        }
    }

    /// Returns the context nested runs start from.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the root nested runs inherit.
    #[must_use]
    pub fn root(&self) -> &Root {
        &self.options.root
    }

    /// Returns the branch path of the owning step.
    #[must_use]
    pub fn branch_path(&self) -> &BranchPath {
        &self.options.branch_path
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    /// Fails if one more level of nesting would exceed the configured
    /// maximum depth.
    pub fn check_depth(&self) -> Result<(), BrickflowError> {
        let max_depth = self.engine.config().max_depth;
        if self.options.branch_path.depth() >= max_depth {
            return Err(BusinessError::new(format!(
                "Maximum pipeline nesting depth ({max_depth}) exceeded"
            ))
            .into());
        }
        Ok(())
    }

    fn nested_options(&self, branch: Branch) -> Result<RunOptions, BrickflowError> {
        self.check_depth()?;
        let path = self.options.branch_path.push(branch);
        Ok(self.options.clone().with_branch_path(path))
    }

    /// Runs `pipeline` against the owning step's context.
    pub fn run<'a>(
        &'a self,
        pipeline: &'a Pipeline,
        branch: Branch,
    ) -> BoxFuture<'a, Result<Value, BrickflowError>> {
        self.run_with_context(pipeline, branch, self.context.clone())
    }

    /// Runs `pipeline` against a context derived from [`Self::context`],
    /// e.g. with a loop variable bound.
    pub fn run_with_context<'a>(
        &'a self,
        pipeline: &'a Pipeline,
        branch: Branch,
        context: Context,
    ) -> BoxFuture<'a, Result<Value, BrickflowError>> {
        async move {
            let options = self.nested_options(branch)?;
            self.engine.run(pipeline, context, options).await
        }
        .boxed()
    }

    /// Starts `pipeline` as a detached task and returns its tracking id
    /// without waiting.
    ///
    /// Failures and panics go to the engine's
    /// [`DetachedRunTracker`](super::DetachedRunTracker). Detached runs are
    /// not cancelled when the owning pipeline finishes.
    pub fn spawn_detached(&self, pipeline: Pipeline, branch: Branch) -> Result<Uuid, BrickflowError> {
        let options = self.nested_options(branch)?;
        let info = DetachedRunInfo::new(
            self.origin.run_id,
            self.origin.brick_id.clone(),
            self.origin.instance_id,
            options.branch_path.clone(),
        );
        let id = info.id;
        let engine = self.engine.clone();
        let context = self.context.clone();
        self.engine.detached().spawn(info, self.logger.clone(), async move {
            engine.run(&pipeline, context, options).await
        });
        Ok(id)
    }

    /// Renders an expression against `context` with the engine's render
    /// options. Used for deferred arguments.
    pub fn render(&self, expr: &Expression, context: &Context) -> Result<Value, InputRenderError> {
        self.engine
            .renderer()
            .render(expr, context, self.engine.render_options())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::core::{Branch, BrickId};
    use crate::errors::BrickflowError;
    use crate::expression::Expression;
    use crate::pipeline::{BrickConfig, Pipeline};
    use crate::testing::TestEngine;
    use serde_json::json;

    #[tokio::test]
    async fn test_nested_run_inherits_context() {
        let harness = TestEngine::new();
        let options = harness.brick_options_with_context(
            &BrickId::parse("@test/parent").unwrap(),
            harness.context().with_binding("@outer", json!("visible")),
        );

        let pipeline = Pipeline::new(vec![harness.echo_step(Expression::var("@outer"))]);
        let out = options
            .runner
            .run(&pipeline, Branch::new("branch", 0))
            .await
            .unwrap();
        assert_eq!(out, json!({"message": "visible"}));

        let enters = harness.recorder.enters();
        assert_eq!(enters.len(), 1);
        assert_eq!(enters[0].branch_path.to_string(), "branch:0");
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let harness = TestEngine::with_config(EngineConfig::default().with_max_depth(0));
        let options = harness.brick_options(&BrickId::parse("@test/parent").unwrap());
        let pipeline = Pipeline::new(vec![BrickConfig::new("@test/echo").unwrap()]);

        let err = options
            .runner
            .run(&pipeline, Branch::new("branch", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, BrickflowError::Business(_)));
        assert!(err.to_string().contains("nesting depth (0)"));
    }

    #[tokio::test]
    async fn test_render_uses_engine_options() {
        let harness = TestEngine::with_config(EngineConfig::default().with_autoescape(false));
        let options = harness.brick_options(&BrickId::parse("@test/parent").unwrap());
        let ctx = options.context.with_binding("@element", json!("<b>"));
        let out = options
            .runner
            .render(&Expression::mustache("{{ @element }}"), &ctx)
            .unwrap();
        assert_eq!(out, json!("<b>"));
    }
}
