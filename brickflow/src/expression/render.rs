//! Expression rendering.
//!
//! Rendering is pure: it reads the [`Context`] and never executes nested
//! pipelines. Walking an object or array follows JSON serialization rules
//! for undefined values: object keys are dropped, array slots become `null`.

use super::path::{Resolved, VarPath};
use super::template::TemplateEngines;
use super::{Expression, TemplateExpression};
use crate::context::Context;
use crate::errors::InputRenderError;
use serde_json::{Map, Value};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options controlling how templates are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// HTML-escape template output.
    pub autoescape: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { autoescape: true }
    }
}

impl RenderOptions {
    /// Sets whether template output is HTML-escaped.
    #[must_use]
    pub fn with_autoescape(mut self, autoescape: bool) -> Self {
        self.autoescape = autoescape;
        self
    }
}

/// A top-level config field dropped because a variable it references was
/// missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    /// The config field.
    pub field: String,
    /// The variable path that failed to resolve.
    pub path: String,
}

impl MissingField {
    /// Converts to the error raised when the field turns out to be required.
    #[must_use]
    pub fn into_error(self) -> InputRenderError {
        InputRenderError::MissingVariable {
            path: self.path,
            field: self.field,
        }
    }
}

/// The result of rendering a step's whole config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedConfig {
    /// Rendered arguments.
    pub args: Map<String, Value>,
    /// Fields omitted because of missing variables.
    pub missing: Vec<MissingField>,
}

struct Scope<'a> {
    ctx: &'a Context,
    options: RenderOptions,
    template_scope: OnceCell<Value>,
}

impl Scope<'_> {
    fn template_scope(&self) -> &Value {
        self.template_scope.get_or_init(|| self.ctx.to_template_scope())
    }
}

fn child_field(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Resolves [`Expression`]s against a [`Context`].
#[derive(Debug, Clone, Default)]
pub struct ExpressionRenderer {
    templates: Arc<TemplateEngines>,
}

impl ExpressionRenderer {
    /// Creates a renderer with fresh template engines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders a single expression. An undefined result renders as `null`.
    pub fn render(
        &self,
        expr: &Expression,
        ctx: &Context,
        options: RenderOptions,
    ) -> Result<Value, InputRenderError> {
        self.render_field(expr, ctx, options, "")
    }

    /// Renders an expression, attributing errors to `field`.
    pub fn render_field(
        &self,
        expr: &Expression,
        ctx: &Context,
        options: RenderOptions,
        field: &str,
    ) -> Result<Value, InputRenderError> {
        let scope = Scope {
            ctx,
            options,
            template_scope: OnceCell::new(),
        };
        Ok(self.render_node(expr, &scope, field)?.unwrap_or(Value::Null))
    }

    /// Renders a step's config.
    ///
    /// Top-level fields that render undefined are omitted. Fields that hit a
    /// missing variable are omitted and listed in
    /// [`RenderedConfig::missing`] so the caller can decide, once the
    /// brick's schema is known, whether that is an error.
    pub fn render_config(
        &self,
        config: &BTreeMap<String, Expression>,
        ctx: &Context,
        options: RenderOptions,
    ) -> Result<RenderedConfig, InputRenderError> {
        let scope = Scope {
            ctx,
            options,
            template_scope: OnceCell::new(),
        };
        let mut rendered = RenderedConfig::default();
        for (key, expr) in config {
            match self.render_node(expr, &scope, key) {
                Ok(Some(value)) => {
                    rendered.args.insert(key.clone(), value);
                }
                Ok(None) => {}
                Err(InputRenderError::MissingVariable { path, .. }) => {
                    rendered.missing.push(MissingField {
                        field: key.clone(),
                        path,
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(rendered)
    }

    fn render_node(
        &self,
        expr: &Expression,
        scope: &Scope<'_>,
        field: &str,
    ) -> Result<Option<Value>, InputRenderError> {
        match expr {
            Expression::Literal(value) => Ok(Some(value.clone())),
            Expression::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, child) in map {
                    if let Some(value) = self.render_node(child, scope, &child_field(field, key))? {
                        out.insert(key.clone(), value);
                    }
                }
                Ok(Some(Value::Object(out)))
            }
            Expression::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    self.render_node(item, scope, &format!("{field}[{i}]"))
                        .map(|v| v.unwrap_or(Value::Null))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|items| Some(Value::Array(items))),
            Expression::Var(raw) => Self::render_var(raw, scope.ctx, field),
            Expression::Template(template) => self.render_template(template, scope, field).map(Some),
            Expression::Pipeline(_) | Expression::Defer(_) => serde_json::to_value(expr)
                .map(Some)
                .map_err(|e| InputRenderError::Serialization {
                    field: field.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    fn render_var(raw: &str, ctx: &Context, field: &str) -> Result<Option<Value>, InputRenderError> {
        let path = VarPath::parse(raw).map_err(|message| InputRenderError::InvalidPath {
            path: raw.to_string(),
            field: field.to_string(),
            message,
        })?;
        match path.resolve(ctx) {
            Resolved::Value(value) => Ok(Some(value.clone())),
            Resolved::Undefined => Ok(None),
            Resolved::Missing => Err(InputRenderError::MissingVariable {
                path: raw.to_string(),
                field: field.to_string(),
            }),
        }
    }

    fn render_template(
        &self,
        template: &TemplateExpression,
        scope: &Scope<'_>,
        field: &str,
    ) -> Result<Value, InputRenderError> {
        self.templates
            .render(
                template.dialect,
                &template.source,
                scope.template_scope(),
                scope.options.autoescape,
            )
            .map(Value::String)
            .map_err(|message| InputRenderError::Template {
                dialect: template.dialect.to_string(),
                template: template.source.clone(),
                field: field.to_string(),
                message,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{BrickConfig, Pipeline};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ctx() -> Context {
        Context::new()
            .with_input(json!({"name": "Ada", "user": null, "html": "<i>x</i>"}))
            .with_options(json!({"greeting": "Hello"}))
    }

    fn expr(value: Value) -> Expression {
        Expression::try_from(value).unwrap()
    }

    #[test]
    fn test_plain_json_passes_through() {
        let renderer = ExpressionRenderer::new();
        let value = json!({"a": [1, "two", {"b": null}], "c": true});
        let out = renderer.render(&expr(value.clone()), &ctx(), RenderOptions::default()).unwrap();
        assert_eq!(out, value);
    }

    #[test]
    fn test_nested_expressions_resolve() {
        let renderer = ExpressionRenderer::new();
        let out = renderer
            .render(
                &expr(json!({
                    "who": {"__type__": "var", "__value__": "@input.name"},
                    "list": [{"__type__": "mustache", "__value__": "{{ @options.greeting }}!"}],
                })),
                &ctx(),
                RenderOptions::default(),
            )
            .unwrap();
        assert_eq!(out, json!({"who": "Ada", "list": ["Hello!"]}));
    }

    #[test]
    fn test_optional_chain_renders_null_required_fails() {
        let renderer = ExpressionRenderer::new();
        let optional = renderer
            .render(&Expression::var("@input.user?.name"), &ctx(), RenderOptions::default())
            .unwrap();
        assert_eq!(optional, Value::Null);

        let err = renderer
            .render_field(&Expression::var("@input.user.name"), &ctx(), RenderOptions::default(), "who")
            .unwrap_err();
        assert_eq!(
            err,
            InputRenderError::MissingVariable {
                path: "@input.user.name".to_string(),
                field: "who".to_string(),
            }
        );
    }

    #[test]
    fn test_undefined_inside_containers() {
        let renderer = ExpressionRenderer::new();
        let out = renderer
            .render(
                &expr(json!({
                    "gone": {"__type__": "var", "__value__": "@input.missing?"},
                    "kept": [{"__type__": "var", "__value__": "@input.missing?"}],
                })),
                &ctx(),
                RenderOptions::default(),
            )
            .unwrap();
        assert_eq!(out, json!({"kept": [null]}));
    }

    #[test]
    fn test_autoescape_toggle() {
        let renderer = ExpressionRenderer::new();
        let template = Expression::mustache("{{ @input.html }}");
        let escaped = renderer.render(&template, &ctx(), RenderOptions::default()).unwrap();
        assert_eq!(escaped, json!("&lt;i&gt;x&lt;/i&gt;"));

        let raw = renderer
            .render(&template, &ctx(), RenderOptions::default().with_autoescape(false))
            .unwrap();
        assert_eq!(raw, json!("<i>x</i>"));
    }

    #[test]
    fn test_template_error_carries_source_and_field() {
        let renderer = ExpressionRenderer::new();
        let err = renderer
            .render_field(&Expression::nunjucks("{% if %}"), &ctx(), RenderOptions::default(), "body.text")
            .unwrap_err();
        match err {
            InputRenderError::Template {
                dialect,
                template,
                field,
                ..
            } => {
                assert_eq!(dialect, "nunjucks");
                assert_eq!(template, "{% if %}");
                assert_eq!(field, "body.text");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_path_is_render_error() {
        let renderer = ExpressionRenderer::new();
        let err = renderer
            .render(&Expression::var("input.name"), &ctx(), RenderOptions::default())
            .unwrap_err();
        assert!(matches!(err, InputRenderError::InvalidPath { .. }));
    }

    #[test]
    fn test_pipeline_and_defer_are_opaque() {
        let renderer = ExpressionRenderer::new();
        let pipeline = Pipeline::new(vec![BrickConfig::new("@test/echo")
            .unwrap()
            .with_arg("message", Expression::var("@input.nope"))]);
        let body = Expression::pipeline(pipeline);

        let out = renderer.render(&body, &ctx(), RenderOptions::default()).unwrap();
        assert_eq!(out["__type__"], "pipeline");
        assert_eq!(out["__value__"][0]["config"]["message"]["__value__"], "@input.nope");

        let deferred = Expression::defer(Expression::var("@input.nope"));
        let out = renderer.render(&deferred, &ctx(), RenderOptions::default()).unwrap();
        assert_eq!(
            out,
            json!({"__type__": "defer", "__value__": {"__type__": "var", "__value__": "@input.nope"}})
        );
    }

    #[test]
    fn test_render_config_records_missing_fields() {
        let renderer = ExpressionRenderer::new();
        let config: BTreeMap<String, Expression> = [
            ("name".to_string(), Expression::var("@input.name")),
            ("nested".to_string(), expr(json!({"x": {"__type__": "var", "__value__": "@input.nope.x"}}))),
            ("optional".to_string(), Expression::var("@input.nope?")),
        ]
        .into_iter()
        .collect();

        let rendered = renderer.render_config(&config, &ctx(), RenderOptions::default()).unwrap();
        assert_eq!(rendered.args, json!({"name": "Ada"}).as_object().unwrap().clone());
        assert_eq!(
            rendered.missing,
            vec![MissingField {
                field: "nested".to_string(),
                path: "@input.nope.x".to_string(),
            }]
        );
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let renderer = ExpressionRenderer::new();
        let e = expr(json!({
            "a": {"__type__": "handlebars", "__value__": "{{ @input.name }}"},
            "b": {"__type__": "var", "__value__": "@options"},
        }));
        let first = renderer.render(&e, &ctx(), RenderOptions::default()).unwrap();
        let second = renderer.render(&e, &ctx(), RenderOptions::default()).unwrap();
        assert_eq!(first, second);
    }
}
