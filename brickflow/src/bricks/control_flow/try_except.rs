use super::{key_arg, pipeline_schema, TRY_EXCEPT_BRICK_ID};
use crate::bricks::{Brick, BrickArgs, BrickOptions};
use crate::core::{Branch, BrickId};
use crate::errors::BrickflowError;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Runs `try`, falling back to `except` if it fails, then always runs
/// `finally`.
///
/// The caught error is bound as `@<errorKey>` (default `@error`) while
/// `except` runs. A failure without an `except` branch is swallowed and the
/// brick returns `{}`. Fatal errors are never caught, though `finally` still
/// runs. An error raised by `finally` replaces the outcome of the earlier
/// branches.
#[derive(Debug, Clone)]
pub struct TryExceptBrick {
    id: BrickId,
}

impl TryExceptBrick {
    /// Creates the brick.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: BrickId::from_static(TRY_EXCEPT_BRICK_ID),
        }
    }
}

impl Default for TryExceptBrick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for TryExceptBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    fn name(&self) -> &str {
        "Try-Except"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "try": pipeline_schema(),
                "except": pipeline_schema(),
                "finally": pipeline_schema(),
                "errorKey": {"type": "string", "default": "error"},
            },
            "required": ["try"],
        })
    }

    fn is_root_aware(&self) -> bool {
        true
    }

    async fn run(&self, args: BrickArgs, options: &BrickOptions) -> Result<Value, BrickflowError> {
        let try_body = args.required_pipeline("try")?;
        let except = args.pipeline("except")?;
        let finally = args.pipeline("finally")?;
        let error_key = key_arg(&args, "errorKey", "error")?;
        let runner = &options.runner;

        let outcome = match runner.run(&try_body, Branch::new("try", 0)).await {
            Ok(output) => Ok(output),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                options.logger.debug(format!("Caught error: {err}"));
                match &except {
                    Some(except) => {
                        let context = runner
                            .context()
                            .with_output(&error_key, serde_json::to_value(err.to_trace_info())?);
                        runner
                            .run_with_context(except, Branch::new("except", 0), context)
                            .await
                    }
                    None => Ok(json!({})),
                }
            }
        };

        if let Some(finally) = finally {
            runner.run(&finally, Branch::new("finally", 0)).await?;
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::BrickflowError;
    use crate::expression::Expression;
    use crate::pipeline::{BrickConfig, Pipeline};
    use crate::testing::{CountingBrick, TestEngine};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pipeline_of(steps: Vec<BrickConfig>) -> Expression {
        Expression::pipeline(Pipeline::new(steps))
    }

    #[tokio::test]
    async fn test_except_sees_error_binding() {
        let harness = TestEngine::new();
        let finally = CountingBrick::new("@test/finally");
        harness.registry.register_one(finally.clone());

        let step = BrickConfig::new(super::TRY_EXCEPT_BRICK_ID)
            .unwrap()
            .with_arg("try", pipeline_of(vec![BrickConfig::new("@test/fail").unwrap()]))
            .with_arg(
                "except",
                pipeline_of(vec![harness.echo_step(Expression::var("@problem.message"))]),
            )
            .with_arg("finally", pipeline_of(vec![BrickConfig::new("@test/finally").unwrap()]))
            .with_arg("errorKey", Expression::literal("problem"));

        let out = harness.run(Pipeline::new(vec![step]), json!({})).await.unwrap();
        assert_eq!(out, json!({"message": "Intentional failure"}));
        assert_eq!(finally.count(), 1);
    }

    #[tokio::test]
    async fn test_success_skips_except() {
        let harness = TestEngine::new();
        let step = BrickConfig::new(super::TRY_EXCEPT_BRICK_ID)
            .unwrap()
            .with_arg("try", pipeline_of(vec![harness.echo_step(Expression::literal("ok"))]))
            .with_arg("except", pipeline_of(vec![BrickConfig::new("@test/fail").unwrap()]));

        let out = harness.run(Pipeline::new(vec![step]), json!({})).await.unwrap();
        assert_eq!(out, json!({"message": "ok"}));
    }

    #[tokio::test]
    async fn test_missing_except_swallows_error() {
        let harness = TestEngine::new();
        let step = BrickConfig::new(super::TRY_EXCEPT_BRICK_ID)
            .unwrap()
            .with_arg("try", pipeline_of(vec![BrickConfig::new("@test/fail").unwrap()]));

        let out = harness.run(Pipeline::new(vec![step]), json!({})).await.unwrap();
        assert_eq!(out, json!({}));
    }

    #[tokio::test]
    async fn test_fatal_error_propagates_after_finally() {
        let harness = TestEngine::new();
        let finally = CountingBrick::new("@test/finally");
        harness.registry.register_one(finally.clone());

        let step = BrickConfig::new(super::TRY_EXCEPT_BRICK_ID)
            .unwrap()
            .with_arg("try", pipeline_of(vec![BrickConfig::new("@test/unknown").unwrap()]))
            .with_arg("except", pipeline_of(vec![harness.echo_step(Expression::literal("caught"))]))
            .with_arg("finally", pipeline_of(vec![BrickConfig::new("@test/finally").unwrap()]));

        let err = harness.run(Pipeline::new(vec![step]), json!({})).await.unwrap_err();
        assert!(matches!(err, BrickflowError::BrickNotFound(_)));
        assert_eq!(finally.count(), 1);
    }
}
