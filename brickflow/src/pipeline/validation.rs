//! Schema defaults and validation of rendered arguments.

use crate::core::BrickId;
use crate::errors::InvalidInputError;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;

struct CompiledSchema {
    schema: Value,
    validator: Arc<jsonschema::Validator>,
}

/// Validates arguments against brick input schemas, caching compiled
/// validators per brick.
#[derive(Default)]
pub struct InputValidator {
    cache: DashMap<BrickId, CompiledSchema>,
}

impl std::fmt::Debug for InputValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputValidator")
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl InputValidator {
    /// Creates an empty validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills missing arguments from top-level `properties.<name>.default`.
    pub fn apply_defaults(schema: &Value, args: &mut Map<String, Value>) {
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return;
        };
        for (name, property) in properties {
            if args.contains_key(name) {
                continue;
            }
            if let Some(default) = property.get("default") {
                args.insert(name.clone(), default.clone());
            }
        }
    }

    /// Returns true if a field omitted because of a missing variable must
    /// fail the step: the schema requires it or does not declare it.
    #[must_use]
    pub fn missing_is_error(schema: &Value, field: &str) -> bool {
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .is_some_and(|r| r.iter().any(|f| f.as_str() == Some(field)));
        let declared = schema
            .get("properties")
            .and_then(Value::as_object)
            .is_some_and(|p| p.contains_key(field));
        required || !declared
    }

    /// Validates `args` against `schema`.
    pub fn validate(
        &self,
        brick_id: &BrickId,
        schema: &Value,
        args: &Value,
    ) -> Result<(), InvalidInputError> {
        let validator = self.compiled(brick_id, schema)?;
        let errors: Vec<String> = validator
            .iter_errors(args)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(InvalidInputError::new(brick_id.as_str(), errors))
        }
    }

    fn compiled(
        &self,
        brick_id: &BrickId,
        schema: &Value,
    ) -> Result<Arc<jsonschema::Validator>, InvalidInputError> {
        if let Some(entry) = self.cache.get(brick_id) {
            if entry.schema == *schema {
                return Ok(Arc::clone(&entry.validator));
            }
        }

        let validator = jsonschema::validator_for(schema).map(Arc::new).map_err(|e| {
            InvalidInputError::new(brick_id.as_str(), vec![format!("Invalid schema: {e}")])
        })?;
        self.cache.insert(
            brick_id.clone(),
            CompiledSchema {
                schema: schema.clone(),
                validator: Arc::clone(&validator),
            },
        );
        Ok(validator)
    }

    /// Returns the number of cached validators.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {"type": "string"},
                "count": {"type": "integer", "default": 1},
                "note": {"type": "string"},
            },
            "required": ["message"],
        })
    }

    fn id() -> BrickId {
        BrickId::parse("@test/echo").unwrap()
    }

    #[test]
    fn test_apply_defaults() {
        let mut args = Map::new();
        InputValidator::apply_defaults(&schema(), &mut args);
        assert_eq!(Value::Object(args), json!({"count": 1}));

        let mut args = json!({"count": 5}).as_object().unwrap().clone();
        InputValidator::apply_defaults(&schema(), &mut args);
        assert_eq!(args["count"], 5);
    }

    #[test]
    fn test_missing_is_error() {
        assert!(InputValidator::missing_is_error(&schema(), "message"));
        assert!(!InputValidator::missing_is_error(&schema(), "note"));
        assert!(InputValidator::missing_is_error(&schema(), "undeclared"));
        assert!(InputValidator::missing_is_error(&json!({"type": "object"}), "anything"));
    }

    #[test]
    fn test_validate() {
        let validator = InputValidator::new();
        assert!(validator.validate(&id(), &schema(), &json!({"message": "hi"})).is_ok());

        let err = validator
            .validate(&id(), &schema(), &json!({"message": 3}))
            .unwrap_err();
        assert_eq!(err.brick_id.as_deref(), Some("@test/echo"));
        assert_eq!(err.errors.len(), 1);
        assert!(err.errors[0].starts_with("/message"));

        assert!(validator.validate(&id(), &schema(), &json!({})).is_err());
    }

    #[test]
    fn test_cache_recompiles_on_schema_change() {
        let validator = InputValidator::new();
        validator.validate(&id(), &schema(), &json!({"message": "hi"})).unwrap();
        validator.validate(&id(), &schema(), &json!({"message": "hi"})).unwrap();
        assert_eq!(validator.cached(), 1);

        let strict = json!({"type": "object", "required": ["other"]});
        assert!(validator.validate(&id(), &strict, &json!({"message": "hi"})).is_err());
        assert_eq!(validator.cached(), 1);
    }

    #[test]
    fn test_invalid_schema() {
        let validator = InputValidator::new();
        let err = validator
            .validate(&id(), &json!({"type": 12}), &json!({}))
            .unwrap_err();
        assert!(err.errors[0].starts_with("Invalid schema"));
    }
}
