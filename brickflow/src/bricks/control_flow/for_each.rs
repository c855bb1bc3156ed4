use super::{elements_arg, key_arg, pipeline_schema, FOR_EACH_BRICK_ID};
use crate::bricks::{Brick, BrickArgs, BrickOptions};
use crate::core::{Branch, BrickId};
use crate::errors::BrickflowError;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Runs `body` once per element, in order, with the element bound as
/// `@<elementKey>` (default `@element`).
///
/// Returns the last iteration's output, or `{}` for an empty array. The
/// first failing iteration stops the loop.
#[derive(Debug, Clone)]
pub struct ForEachBrick {
    id: BrickId,
}

impl ForEachBrick {
    /// Creates the brick.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: BrickId::from_static(FOR_EACH_BRICK_ID),
        }
    }
}

impl Default for ForEachBrick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for ForEachBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    fn name(&self) -> &str {
        "For-Each"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "elements": {"type": "array"},
                "elementKey": {"type": "string", "default": "element"},
                "body": pipeline_schema(),
            },
            "required": ["elements", "body"],
        })
    }

    fn is_root_aware(&self) -> bool {
        true
    }

    async fn run(&self, args: BrickArgs, options: &BrickOptions) -> Result<Value, BrickflowError> {
        let elements = elements_arg(&args)?;
        let element_key = key_arg(&args, "elementKey", "element")?;
        let body = args.required_pipeline("body")?;
        let runner = &options.runner;

        let mut last = json!({});
        for (index, element) in elements.into_iter().enumerate() {
            let context = runner.context().with_output(&element_key, element);
            last = runner
                .run_with_context(&body, Branch::new("body", index), context)
                .await?;
        }
        Ok(last)
    }
}
