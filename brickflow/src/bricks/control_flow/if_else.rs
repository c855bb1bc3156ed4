use super::{pipeline_schema, IF_ELSE_BRICK_ID};
use crate::bricks::{Brick, BrickArgs, BrickOptions};
use crate::core::{Branch, BrickId};
use crate::errors::BrickflowError;
use crate::utils::is_truthy;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Runs `if` when `condition` is truthy and `else` otherwise.
///
/// Returns `{}` when the selected branch is absent.
#[derive(Debug, Clone)]
pub struct IfElseBrick {
    id: BrickId,
}

impl IfElseBrick {
    /// Creates the brick.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: BrickId::from_static(IF_ELSE_BRICK_ID),
        }
    }
}

impl Default for IfElseBrick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for IfElseBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    fn name(&self) -> &str {
        "If-Else"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "condition": {},
                "if": pipeline_schema(),
                "else": pipeline_schema(),
            },
        })
    }

    fn is_root_aware(&self) -> bool {
        true
    }

    async fn run(&self, args: BrickArgs, options: &BrickOptions) -> Result<Value, BrickflowError> {
        let key = if args.get("condition").is_some_and(is_truthy) {
            "if"
        } else {
            "else"
        };

        match args.pipeline(key)? {
            Some(body) => options.runner.run(&body, Branch::new(key, 0)).await,
            None => Ok(json!({})),
        }
    }
}
