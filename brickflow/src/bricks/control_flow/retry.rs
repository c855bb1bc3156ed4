use super::{pipeline_schema, BRANCH_KEY, RETRY_BRICK_ID};
use crate::bricks::{Brick, BrickArgs, BrickOptions};
use crate::core::{Branch, BrickId};
use crate::errors::{BrickflowError, BusinessError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Runs its `body` until it succeeds.
///
/// `maxRetries` counts retries, so a body that always fails runs
/// `maxRetries + 1` times before the last error is returned. Without
/// `maxRetries` the engine's `default_max_retries` applies, and without that
/// the brick retries indefinitely. `intervalMillis` is slept before every
/// attempt after the first; with no interval the task still yields to the
/// runtime between attempts. Fatal errors are returned without retrying.
#[derive(Debug, Clone)]
pub struct RetryBrick {
    id: BrickId,
}

impl RetryBrick {
    /// Creates the brick.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: BrickId::from_static(RETRY_BRICK_ID),
        }
    }
}

impl Default for RetryBrick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for RetryBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    fn name(&self) -> &str {
        "Retry"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "body": pipeline_schema(),
                "maxRetries": {"type": "integer", "minimum": 0},
                "intervalMillis": {"type": "integer", "minimum": 0, "default": 0},
            },
            "required": ["body"],
        })
    }

    fn is_root_aware(&self) -> bool {
        true
    }

    async fn run(&self, args: BrickArgs, options: &BrickOptions) -> Result<Value, BrickflowError> {
        let body = args.required_pipeline("body")?;
        let max_retries = args
            .get_u64("maxRetries")
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .or(options.runner.config().default_max_retries)
            .unwrap_or(usize::MAX);
        let interval = Duration::from_millis(args.get_u64("intervalMillis").unwrap_or(0));

        // Nesting past the limit fails the same way on every attempt.
        options.runner.check_depth()?;

        let mut last_error = None;
        for attempt in 0..=max_retries {
            if attempt > 0 {
                if interval.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(interval).await;
                }
            }

            match options.runner.run(&body, Branch::new(BRANCH_KEY, attempt)).await {
                Ok(output) => return Ok(output),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    options
                        .logger
                        .warn(format!("Retry attempt {} failed: {err}", attempt + 1));
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| BusinessError::max_retries_exceeded().into()))
    }
}
