//! The expression model.
//!
//! Brick configuration values are [`Expression`]s. On the wire an
//! expression is either plain JSON (walked recursively) or a tagged object
//! `{"__type__": <tag>, "__value__": <payload>}`.

mod path;
pub mod render;
mod template;

pub use path::{PathSegment, Resolved, SegmentKey, VarPath};
pub use render::{ExpressionRenderer, MissingField, RenderOptions, RenderedConfig};
pub use template::TemplateEngines;

use crate::pipeline::Pipeline;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Key holding the tag of a tagged expression.
pub const TYPE_KEY: &str = "__type__";

/// Key holding the payload of a tagged expression.
pub const VALUE_KEY: &str = "__value__";

/// Raised when a tagged object is not a well-formed expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid expression: {0}")]
pub struct ExpressionError(pub String);

/// Template languages a [`TemplateExpression`] can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateDialect {
    /// Logic-less `{{name}}` templates.
    Mustache,
    /// Handlebars templates with helpers and block expressions.
    Handlebars,
    /// Nunjucks (Jinja-style) templates.
    Nunjucks,
}

impl TemplateDialect {
    /// Returns the wire tag for this dialect.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Mustache => "mustache",
            Self::Handlebars => "handlebars",
            Self::Nunjucks => "nunjucks",
        }
    }

    /// Parses a wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "mustache" => Some(Self::Mustache),
            "handlebars" => Some(Self::Handlebars),
            "nunjucks" => Some(Self::Nunjucks),
            _ => None,
        }
    }
}

impl fmt::Display for TemplateDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A template string in a specific dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateExpression {
    /// The template language.
    pub dialect: TemplateDialect,
    /// The template source.
    pub source: String,
}

/// A brick configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A value used as-is; never walked.
    Literal(Value),
    /// A plain object whose values are themselves expressions.
    Object(BTreeMap<String, Expression>),
    /// A plain array whose items are themselves expressions.
    Array(Vec<Expression>),
    /// A variable path such as `@input.user?.name`.
    Var(String),
    /// A template string.
    Template(TemplateExpression),
    /// A nested pipeline, passed to the brick unexecuted.
    Pipeline(Pipeline),
    /// An expression left unresolved at render time.
    Defer(Box<Expression>),
}

impl Expression {
    /// Creates a literal expression.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Creates a variable expression.
    pub fn var(path: impl Into<String>) -> Self {
        Self::Var(path.into())
    }

    /// Creates a template expression.
    pub fn template(dialect: TemplateDialect, source: impl Into<String>) -> Self {
        Self::Template(TemplateExpression {
            dialect,
            source: source.into(),
        })
    }

    /// Creates a mustache template expression.
    pub fn mustache(source: impl Into<String>) -> Self {
        Self::template(TemplateDialect::Mustache, source)
    }

    /// Creates a handlebars template expression.
    pub fn handlebars(source: impl Into<String>) -> Self {
        Self::template(TemplateDialect::Handlebars, source)
    }

    /// Creates a nunjucks template expression.
    pub fn nunjucks(source: impl Into<String>) -> Self {
        Self::template(TemplateDialect::Nunjucks, source)
    }

    /// Creates a nested pipeline expression.
    #[must_use]
    pub fn pipeline(pipeline: Pipeline) -> Self {
        Self::Pipeline(pipeline)
    }

    /// Wraps an expression so it is left unresolved at render time.
    #[must_use]
    pub fn defer(inner: Self) -> Self {
        Self::Defer(Box::new(inner))
    }

    /// Returns the wire tag, or `None` for plain JSON.
    #[must_use]
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Literal(value) if value.is_object() || value.is_array() => Some("literal"),
            Self::Literal(_) | Self::Object(_) | Self::Array(_) => None,
            Self::Var(_) => Some("var"),
            Self::Template(t) => Some(t.dialect.tag()),
            Self::Pipeline(_) => Some("pipeline"),
            Self::Defer(_) => Some("defer"),
        }
    }

    /// Returns true for expressions the renderer passes through opaquely.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Pipeline(_) | Self::Defer(_))
    }

    /// Converts to the wire form.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Returns the tag and payload if `value` is a tagged expression object.
#[must_use]
pub fn as_tagged(value: &Value) -> Option<(&str, &Value)> {
    let map = value.as_object()?;
    let tag = map.get(TYPE_KEY)?.as_str()?;
    let payload = map.get(VALUE_KEY)?;
    Some((tag, payload))
}

fn expect_string(tag: &str, payload: Value) -> Result<String, ExpressionError> {
    match payload {
        Value::String(s) => Ok(s),
        other => Err(ExpressionError(format!(
            "'{tag}' expects a string payload, got {other}"
        ))),
    }
}

impl TryFrom<Value> for Expression {
    type Error = ExpressionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        if let Some((tag, _)) = as_tagged(&value) {
            let tag = tag.to_string();
            let payload = match value {
                Value::Object(mut map) => map.remove(VALUE_KEY).unwrap_or(Value::Null),
                _ => Value::Null,
            };
            return match tag.as_str() {
                "literal" => Ok(Self::Literal(payload)),
                "var" => expect_string(&tag, payload).map(Self::Var),
                "pipeline" => {
                    let payload = if payload.is_null() {
                        Value::Array(Vec::new())
                    } else {
                        payload
                    };
                    Pipeline::from_value(payload)
                        .map(Self::Pipeline)
                        .map_err(|e| ExpressionError(format!("invalid pipeline: {e}")))
                }
                "defer" => Ok(Self::defer(Self::try_from(payload)?)),
                other => match TemplateDialect::from_tag(other) {
                    Some(dialect) => expect_string(other, payload).map(|source| {
                        Self::Template(TemplateExpression { dialect, source })
                    }),
                    None => Err(ExpressionError(format!("unknown expression type '{other}'"))),
                },
            };
        }

        match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| Self::try_from(v).map(|e| (k, e)))
                .collect::<Result<_, _>>()
                .map(Self::Object),
            Value::Array(items) => items
                .into_iter()
                .map(Self::try_from)
                .collect::<Result<_, _>>()
                .map(Self::Array),
            scalar => Ok(Self::Literal(scalar)),
        }
    }
}

impl From<TemplateExpression> for Expression {
    fn from(template: TemplateExpression) -> Self {
        Self::Template(template)
    }
}

impl From<Pipeline> for Expression {
    fn from(pipeline: Pipeline) -> Self {
        Self::Pipeline(pipeline)
    }
}

#[derive(Serialize)]
struct Tagged<'a, T: Serialize + ?Sized> {
    #[serde(rename = "__type__")]
    tag: &'a str,
    #[serde(rename = "__value__")]
    value: &'a T,
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(value) if value.is_object() || value.is_array() => Tagged {
                tag: "literal",
                value,
            }
            .serialize(serializer),
            Self::Literal(value) => value.serialize(serializer),
            Self::Object(map) => map.serialize(serializer),
            Self::Array(items) => items.serialize(serializer),
            Self::Var(path) => Tagged {
                tag: "var",
                value: path,
            }
            .serialize(serializer),
            Self::Template(t) => Tagged {
                tag: t.dialect.tag(),
                value: &t.source,
            }
            .serialize(serializer),
            Self::Pipeline(pipeline) => Tagged {
                tag: "pipeline",
                value: pipeline,
            }
            .serialize(serializer),
            Self::Defer(inner) => Tagged {
                tag: "defer",
                value: inner.as_ref(),
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_plain_json_is_walked() {
        let expr = Expression::try_from(json!({
            "greeting": "hello",
            "name": {"__type__": "var", "__value__": "@input.name"},
            "tags": [1, {"__type__": "mustache", "__value__": "{{ @input.tag }}"}],
        }))
        .unwrap();

        let Expression::Object(map) = expr else {
            panic!("expected object");
        };
        assert_eq!(map["greeting"], Expression::literal("hello"));
        assert_eq!(map["name"], Expression::var("@input.name"));
        assert_eq!(
            map["tags"],
            Expression::Array(vec![
                Expression::literal(1),
                Expression::mustache("{{ @input.tag }}"),
            ])
        );
    }

    #[test]
    fn test_literal_payload_is_not_walked() {
        let expr = Expression::try_from(json!({
            "__type__": "literal",
            "__value__": {"__type__": "var", "__value__": "@input"},
        }))
        .unwrap();
        assert_eq!(
            expr,
            Expression::Literal(json!({"__type__": "var", "__value__": "@input"}))
        );
    }

    #[test]
    fn test_nested_pipeline_and_defer() {
        let expr = Expression::try_from(json!({
            "__type__": "defer",
            "__value__": {
                "__type__": "pipeline",
                "__value__": [{"id": "@test/echo", "config": {}}],
            },
        }))
        .unwrap();

        let Expression::Defer(inner) = expr else {
            panic!("expected defer");
        };
        let Expression::Pipeline(pipeline) = *inner else {
            panic!("expected pipeline");
        };
        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline.steps[0].id.as_str(), "@test/echo");
    }

    #[test]
    fn test_null_pipeline_payload_is_empty() {
        let expr = Expression::try_from(json!({"__type__": "pipeline", "__value__": null})).unwrap();
        assert_eq!(expr, Expression::Pipeline(Pipeline::default()));
    }

    #[test]
    fn test_rejects_unknown_tag_and_bad_payload() {
        let err = Expression::try_from(json!({"__type__": "lisp", "__value__": "(+ 1 2)"}))
            .unwrap_err();
        assert!(err.to_string().contains("unknown expression type 'lisp'"));

        let err = Expression::try_from(json!({"__type__": "var", "__value__": 5})).unwrap_err();
        assert!(err.to_string().contains("expects a string payload"));
    }

    #[test]
    fn test_serialized_form_matches_input() {
        let input = json!({
            "count": 3,
            "user": {"__type__": "var", "__value__": "@input.user?.name"},
            "body": {"__type__": "nunjucks", "__value__": "Hi {{ @input.name }}"},
            "raw": {"__type__": "literal", "__value__": [1, 2]},
        });
        let expr: Expression = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&expr).unwrap(), input);
    }

    #[test]
    fn test_tags() {
        assert_eq!(Expression::literal(1).tag(), None);
        assert_eq!(Expression::Literal(json!([])).tag(), Some("literal"));
        assert_eq!(Expression::handlebars("x").tag(), Some("handlebars"));
        assert!(Expression::defer(Expression::literal(1)).is_opaque());
        assert!(!Expression::var("@input").is_opaque());
    }
}
