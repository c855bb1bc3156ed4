use super::{elements_arg, key_arg, MAP_BRICK_ID};
use crate::bricks::{Brick, BrickArgs, BrickOptions};
use crate::core::BrickId;
use crate::errors::BrickflowError;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Renders the deferred `mapping` expression once per element, with the
/// element bound as `@<elementKey>`, and returns the results as an array.
#[derive(Debug, Clone)]
pub struct MapBrick {
    id: BrickId,
}

impl MapBrick {
    /// Creates the brick.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: BrickId::from_static(MAP_BRICK_ID),
        }
    }
}

impl Default for MapBrick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for MapBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    fn name(&self) -> &str {
        "Map"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "elements": {"type": "array"},
                "elementKey": {"type": "string", "default": "element"},
                "mapping": {},
            },
            "required": ["elements", "mapping"],
        })
    }

    fn is_pure(&self) -> bool {
        true
    }

    async fn run(&self, args: BrickArgs, options: &BrickOptions) -> Result<Value, BrickflowError> {
        let elements = elements_arg(&args)?;
        let element_key = key_arg(&args, "elementKey", "element")?;
        let Some(mapping) = args.deferred("mapping")? else {
            return Ok(json!([]));
        };
        let runner = &options.runner;

        elements
            .into_iter()
            .map(|element| {
                let context = runner.context().with_output(&element_key, element);
                runner.render(&mapping, &context).map_err(BrickflowError::from)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}
