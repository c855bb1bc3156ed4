//! Rendered brick arguments.

use crate::errors::InvalidInputError;
use crate::expression::{as_tagged, Expression};
use crate::pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The rendered, validated arguments passed to [`Brick::run`](super::Brick::run).
///
/// Pipeline and deferred arguments arrive as tagged JSON; use
/// [`BrickArgs::pipeline`] and [`BrickArgs::deferred`] to recover them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrickArgs(Map<String, Value>);

impl BrickArgs {
    /// Wraps a rendered argument map.
    #[must_use]
    pub fn new(args: Map<String, Value>) -> Self {
        Self(args)
    }

    /// Wraps a JSON object.
    pub fn from_value(value: Value) -> Result<Self, InvalidInputError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(InvalidInputError::field(
                "args",
                format!("expected an object, got {other}"),
            )),
        }
    }

    /// Returns an argument.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a required argument.
    pub fn require(&self, key: &str) -> Result<&Value, InvalidInputError> {
        self.get(key)
            .ok_or_else(|| InvalidInputError::field(key, "is required"))
    }

    /// Returns a string argument.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns a boolean argument.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Returns a non-negative integer argument.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    /// Returns an array argument.
    #[must_use]
    pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key).and_then(Value::as_array)
    }

    /// Recovers a pipeline argument.
    ///
    /// Accepts only a tagged pipeline expression.
    /// Returns `None` when the argument is absent or null.
    pub fn pipeline(&self, key: &str) -> Result<Option<Pipeline>, InvalidInputError> {
        let payload = match self.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => match as_tagged(value) {
                Some(("pipeline", Value::Null)) => return Ok(Some(Pipeline::default())),
                Some(("pipeline", payload)) => payload,
                Some((tag, _)) => {
                    return Err(InvalidInputError::field(
                        key,
                        format!("expected a pipeline, got a '{tag}' expression"),
                    ))
                }
                None => return Err(InvalidInputError::field(key, "expected a pipeline")),
            },
        };
        Pipeline::from_value(payload.clone())
            .map(Some)
            .map_err(|e| InvalidInputError::field(key, format!("invalid pipeline: {e}")))
    }

    /// Recovers a pipeline argument that must be present.
    pub fn required_pipeline(&self, key: &str) -> Result<Pipeline, InvalidInputError> {
        self.pipeline(key)?
            .ok_or_else(|| InvalidInputError::field(key, "is required"))
    }

    /// Recovers a deferred expression argument.
    ///
    /// A value that was not deferred has already been rendered and comes
    /// back as a literal.
    pub fn deferred(&self, key: &str) -> Result<Option<Expression>, InvalidInputError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match as_tagged(value) {
            Some(("defer", _)) => match Expression::try_from(value.clone()) {
                Ok(Expression::Defer(inner)) => Ok(Some(*inner)),
                Ok(other) => Ok(Some(other)),
                Err(e) => Err(InvalidInputError::field(key, e.to_string())),
            },
            _ => Ok(Some(Expression::Literal(value.clone()))),
        }
    }

    /// Sets an argument.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts to a JSON object.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for BrickArgs {
    fn from(args: Map<String, Value>) -> Self {
        Self(args)
    }
}
