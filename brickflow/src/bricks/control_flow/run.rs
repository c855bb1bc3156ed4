use super::{pipeline_schema, BRANCH_KEY, RUN_BRICK_ID};
use crate::bricks::{Brick, BrickArgs, BrickOptions};
use crate::core::{Branch, BrickId};
use crate::errors::BrickflowError;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Runs its `body` once.
///
/// With `async: true` the body is started as a detached run and the brick
/// returns `{}` immediately. A detached body keeps running after the
/// enclosing pipeline finishes; its failures go to the engine's
/// [`DetachedRunTracker`](crate::subpipeline::DetachedRunTracker).
#[derive(Debug, Clone)]
pub struct RunBrick {
    id: BrickId,
}

impl RunBrick {
    /// Creates the brick.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: BrickId::from_static(RUN_BRICK_ID),
        }
    }
}

impl Default for RunBrick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for RunBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    fn name(&self) -> &str {
        "Run"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "body": pipeline_schema(),
                "async": {"type": "boolean", "default": false},
            },
            "required": ["body"],
        })
    }

    fn is_root_aware(&self) -> bool {
        true
    }

    async fn run(&self, args: BrickArgs, options: &BrickOptions) -> Result<Value, BrickflowError> {
        let body = args.required_pipeline("body")?;
        let branch = Branch::new(BRANCH_KEY, 0);

        if args.get_bool("async").unwrap_or(false) {
            let id = options.runner.spawn_detached(body, branch)?;
            options.logger.debug(format!("Started detached run {id}"));
            return Ok(json!({}));
        }

        options.runner.run(&body, branch).await
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::errors::{BrickflowError, ErrorKind};
    use crate::expression::Expression;
    use crate::pipeline::{BrickConfig, Pipeline, RunOptions};
    use crate::testing::{PendingBrick, TestEngine};
    use serde_json::json;
    use std::time::Duration;

    fn run_step(body: Pipeline, is_async: bool) -> BrickConfig {
        BrickConfig::new(super::RUN_BRICK_ID)
            .unwrap()
            .with_arg("body", Expression::pipeline(body))
            .with_arg("async", Expression::literal(is_async))
    }

    #[tokio::test]
    async fn test_sync_returns_body_output() {
        let harness = TestEngine::new();
        let body = Pipeline::new(vec![harness.echo_step(Expression::var("@input.name"))]);

        let out = harness
            .run(Pipeline::new(vec![run_step(body, false)]), json!({"name": "Ada"}))
            .await
            .unwrap();
        assert_eq!(out, json!({"message": "Ada"}));

        let enters = harness.recorder.enters();
        assert_eq!(enters.len(), 2);
        assert!(enters[0].branch_path.is_empty());
        assert_eq!(enters[1].branch_path.to_string(), "branch:0");
    }

    #[tokio::test]
    async fn test_async_returns_immediately() {
        let harness = TestEngine::new();
        harness.registry.register_one(PendingBrick::new("@test/pending"));
        let body = Pipeline::new(vec![BrickConfig::new("@test/pending").unwrap()]);

        let out = tokio::time::timeout(
            Duration::from_secs(5),
            harness.run(Pipeline::new(vec![run_step(body, true)]), json!({})),
        )
        .await
        .expect("async run should not wait for its body")
        .unwrap();

        assert_eq!(out, json!({}));
        assert_eq!(harness.engine.detached().active_count(), 1);
    }

    #[tokio::test]
    async fn test_async_failure_goes_to_tracker() {
        let harness = TestEngine::new();
        let body = Pipeline::new(vec![BrickConfig::new("@test/fail").unwrap()]);

        let out = harness
            .engine
            .run(
                &Pipeline::new(vec![run_step(body, true)]),
                Context::new(),
                RunOptions::new().with_tracer(harness.recorder.clone()),
            )
            .await
            .unwrap();
        assert_eq!(out, json!({}));

        harness.engine.detached().wait_all().await;
        let failures = harness.engine.detached().failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].error.kind, ErrorKind::Business);
        assert_eq!(failures[0].info.branch_path.to_string(), "branch:0");

        let failed_exit = harness
            .recorder
            .exits()
            .into_iter()
            .find(|e| !e.is_success())
            .expect("body failure is traced");
        assert_eq!(failed_exit.brick_id.as_str(), "@test/fail");
    }

    #[tokio::test]
    async fn test_missing_body_is_invalid_input() {
        let harness = TestEngine::new();
        let step = BrickConfig::new(super::RUN_BRICK_ID).unwrap();
        let err = harness.run(Pipeline::new(vec![step]), json!({})).await.unwrap_err();
        assert!(matches!(err, BrickflowError::InvalidInput(_)));
    }
}
