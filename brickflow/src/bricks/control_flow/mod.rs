//! Control-flow bricks.
//!
//! These are ordinary bricks whose arguments include pipelines. They run
//! those pipelines through [`PipelineRunner`](crate::subpipeline::PipelineRunner),
//! each pass under its own branch so traces can tell passes apart.

mod for_each;
mod if_else;
mod map;
mod retry;
mod run;
mod try_except;

pub use for_each::ForEachBrick;
pub use if_else::IfElseBrick;
pub use map::MapBrick;
pub use retry::RetryBrick;
pub use run::RunBrick;
pub use try_except::TryExceptBrick;

use super::{Brick, BrickArgs};
use crate::core::OutputKey;
use crate::errors::InvalidInputError;
use serde_json::{json, Value};
use std::sync::Arc;

/// Id of [`RunBrick`].
pub const RUN_BRICK_ID: &str = "@pixiebrix/run";
/// Id of [`RetryBrick`].
pub const RETRY_BRICK_ID: &str = "@pixiebrix/retry";
/// Id of [`IfElseBrick`].
pub const IF_ELSE_BRICK_ID: &str = "@pixiebrix/if-else";
/// Id of [`TryExceptBrick`].
pub const TRY_EXCEPT_BRICK_ID: &str = "@pixiebrix/try-catch";
/// Id of [`ForEachBrick`].
pub const FOR_EACH_BRICK_ID: &str = "@pixiebrix/for-each";
/// Id of [`MapBrick`].
pub const MAP_BRICK_ID: &str = "@pixiebrix/map";

/// Branch key used by [`RunBrick`] and [`RetryBrick`].
pub const BRANCH_KEY: &str = "branch";

/// Returns one instance of every built-in control-flow brick.
#[must_use]
pub fn builtin_bricks() -> Vec<Arc<dyn Brick>> {
    vec![
        Arc::new(RunBrick::new()),
        Arc::new(RetryBrick::new()),
        Arc::new(IfElseBrick::new()),
        Arc::new(TryExceptBrick::new()),
        Arc::new(ForEachBrick::new()),
        Arc::new(MapBrick::new()),
    ]
}

/// Schema for a pipeline-typed argument. Only tagged pipelines pass; a plain
/// array would already have been rendered against the caller's context.
pub(crate) fn pipeline_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"__type__": {"const": "pipeline"}},
        "required": ["__type__", "__value__"],
    })
}

/// Reads an output-key argument such as `elementKey`.
pub(crate) fn key_arg(args: &BrickArgs, name: &str, default: &str) -> Result<OutputKey, InvalidInputError> {
    OutputKey::parse(args.get_str(name).unwrap_or(default))
        .map_err(|e| InvalidInputError::field(name, e.to_string()))
}

/// Reads the required `elements` array.
pub(crate) fn elements_arg(args: &BrickArgs) -> Result<Vec<Value>, InvalidInputError> {
    args.get_array("elements")
        .cloned()
        .ok_or_else(|| InvalidInputError::field("elements", "expected an array"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ids_are_unique() {
        let ids: HashSet<String> = builtin_bricks().iter().map(|b| b.id().to_string()).collect();
        assert_eq!(ids.len(), 6);
        assert!(ids.contains(TRY_EXCEPT_BRICK_ID));
    }

    #[test]
    fn test_key_arg() {
        let args = BrickArgs::from_value(json!({"elementKey": "@item", "bad": "1x"})).unwrap();
        assert_eq!(key_arg(&args, "elementKey", "element").unwrap().as_str(), "item");
        assert_eq!(key_arg(&args, "missing", "element").unwrap().as_str(), "element");
        assert!(key_arg(&args, "bad", "element").is_err());
    }
}
