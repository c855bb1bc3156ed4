//! Serializable pipeline definitions.

use crate::core::{BrickId, OutputKey};
use crate::errors::{BrickflowError, IdentifierError};
use crate::expression::Expression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Where a step's root comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootMode {
    /// Use the root the enclosing pipeline runs against.
    #[default]
    Inherit,
    /// Use the document.
    Document,
    /// Render the step's `root` expression and resolve it to an element.
    Element,
}

/// One authored step of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrickConfig {
    /// The brick to invoke.
    pub id: BrickId,
    /// Stable identity of the step, used to correlate traces.
    #[serde(default = "Uuid::new_v4")]
    pub instance_id: Uuid,
    /// Argument expressions, rendered before the brick runs.
    #[serde(default)]
    pub config: BTreeMap<String, Expression>,
    /// Binds the output as `@<outputKey>` for later steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<OutputKey>,
    /// Step runs only when this renders truthy.
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expression>,
    /// Root selection.
    #[serde(default, skip_serializing_if = "is_inherit")]
    pub root_mode: RootMode,
    /// Element reference, used with [`RootMode::Element`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<Expression>,
    /// Display name, reported in traces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_inherit(mode: &RootMode) -> bool {
    *mode == RootMode::Inherit
}

impl BrickConfig {
    /// Creates a step with a fresh instance id and no arguments.
    pub fn new(id: impl AsRef<str>) -> Result<Self, IdentifierError> {
        Ok(Self::for_brick(BrickId::parse(id.as_ref())?))
    }

    /// Creates a step for an already validated brick id.
    #[must_use]
    pub fn for_brick(id: BrickId) -> Self {
        Self {
            id,
            instance_id: Uuid::new_v4(),
            config: BTreeMap::new(),
            output_key: None,
            condition: None,
            root_mode: RootMode::Inherit,
            root: None,
            label: None,
        }
    }

    /// Adds an argument expression.
    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, expr: Expression) -> Self {
        self.config.insert(name.into(), expr);
        self
    }

    /// Sets the output key.
    #[must_use]
    pub fn with_output_key(mut self, key: OutputKey) -> Self {
        self.output_key = Some(key);
        self
    }

    /// Sets the condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Expression) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Sets the root mode.
    #[must_use]
    pub fn with_root_mode(mut self, mode: RootMode) -> Self {
        self.root_mode = mode;
        self
    }

    /// Sets the element root expression and switches to [`RootMode::Element`].
    #[must_use]
    pub fn with_root(mut self, root: Expression) -> Self {
        self.root_mode = RootMode::Element;
        self.root = Some(root);
        self
    }

    /// Sets the instance id.
    #[must_use]
    pub fn with_instance_id(mut self, instance_id: Uuid) -> Self {
        self.instance_id = instance_id;
        self
    }

    /// Sets the display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// An ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    /// The steps, in execution order.
    pub steps: Vec<BrickConfig>,
}

impl Pipeline {
    /// Creates a pipeline from steps.
    #[must_use]
    pub fn new(steps: Vec<BrickConfig>) -> Self {
        Self { steps }
    }

    /// Parses a pipeline from JSON text.
    pub fn from_json(json: &str) -> Result<Self, BrickflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a pipeline from a JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if there are no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterates the steps.
    pub fn iter(&self) -> std::slice::Iter<'_, BrickConfig> {
        self.steps.iter()
    }
}

impl From<Vec<BrickConfig>> for Pipeline {
    fn from(steps: Vec<BrickConfig>) -> Self {
        Self::new(steps)
    }
}

impl FromIterator<BrickConfig> for Pipeline {
    fn from_iter<T: IntoIterator<Item = BrickConfig>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Pipeline {
    type Item = &'a BrickConfig;
    type IntoIter = std::slice::Iter<'a, BrickConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_authored_pipeline() {
        let pipeline = Pipeline::from_json(
            r#"[
                {
                    "id": "@pixiebrix/retry",
                    "instanceId": "6f1c3a52-3a59-4a0f-9c2e-0d1e6c7d9a11",
                    "outputKey": "@result",
                    "if": {"__type__": "var", "__value__": "@input.enabled"},
                    "config": {
                        "maxRetries": 2,
                        "body": {"__type__": "pipeline", "__value__": [{"id": "@test/echo"}]}
                    }
                },
                {"id": "@test/echo", "rootMode": "document", "label": "Echo"}
            ]"#,
        )
        .unwrap();

        assert_eq!(pipeline.len(), 2);
        let retry = &pipeline.steps[0];
        assert_eq!(retry.id.as_str(), "@pixiebrix/retry");
        assert_eq!(retry.output_key.as_ref().unwrap().as_str(), "result");
        assert_eq!(retry.condition, Some(Expression::var("@input.enabled")));
        assert!(matches!(retry.config["body"], Expression::Pipeline(ref p) if p.len() == 1));
        assert_eq!(retry.root_mode, RootMode::Inherit);

        let echo = &pipeline.steps[1];
        assert_eq!(echo.root_mode, RootMode::Document);
        assert_eq!(echo.label.as_deref(), Some("Echo"));
        assert!(echo.config.is_empty());
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        assert!(Pipeline::from_json(r#"[{"id": "Not A Brick"}]"#).is_err());
        assert!(Pipeline::from_json(r#"[{"id": "@test/echo", "outputKey": "1bad"}]"#).is_err());
        assert!(BrickConfig::new("@pixiebrix/").is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let step = BrickConfig::new("@test/echo")
            .unwrap()
            .with_arg("message", Expression::literal("hi"))
            .with_output_key(OutputKey::parse("@greeting").unwrap())
            .with_condition(Expression::literal(true));

        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["id"], "@test/echo");
        assert_eq!(json["outputKey"], "greeting");
        assert_eq!(json["if"], true);
        assert_eq!(json["config"], json!({"message": "hi"}));
        assert!(json.get("rootMode").is_none());

        let back: BrickConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_with_root_switches_mode() {
        let step = BrickConfig::new("@test/echo")
            .unwrap()
            .with_root(Expression::var("@input.selector"));
        assert_eq!(step.root_mode, RootMode::Element);
    }
}
