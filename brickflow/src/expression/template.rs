//! Template dialect engines.
//!
//! Mustache and handlebars sources render through `handlebars`, nunjucks
//! sources through `minijinja`. Both engines treat a missing variable as
//! empty output rather than an error.

use super::TemplateDialect;
use handlebars::Handlebars;
use minijinja::{AutoEscape, Environment};
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

/// Matches the inside of `{{ ... }}` and `{% ... %}` tags.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}").expect("valid tag regex"));

/// Matches `@name` references inside a tag, or a quoted string literal the
/// reference must not be rewritten in.
static ROOT_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|@([A-Za-z_][A-Za-z0-9_]*)"#)
        .expect("valid root regex")
});

/// Handlebars data variables that keep their `@` unless a root shadows them.
const HANDLEBARS_DATA_VARS: [&str; 6] = ["index", "key", "first", "last", "root", "level"];

/// Rewrites `@root` references inside template tags to the bare root names
/// the template scope is keyed by. References for which `keep` returns true
/// are left alone, as is anything inside a string literal.
fn strip_root_sigils<'a>(source: &'a str, keep: impl Fn(&str) -> bool) -> Cow<'a, str> {
    if !source.contains('@') {
        return Cow::Borrowed(source);
    }
    TAG_RE.replace_all(source, |tag: &regex::Captures<'_>| {
        ROOT_REF_RE
            .replace_all(&tag[0], |m: &regex::Captures<'_>| match m.get(1) {
                Some(name) if !keep(name.as_str()) => name.as_str().to_string(),
                _ => m[0].to_string(),
            })
            .into_owned()
    })
}

/// Keeps `@name` for handlebars data variables that are not bound roots.
fn is_unbound_data_var(scope: &Value, name: &str) -> bool {
    HANDLEBARS_DATA_VARS.contains(&name) && scope.get(name).is_none()
}

fn json_helper(
    h: &handlebars::Helper<'_>,
    _: &Handlebars<'_>,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext<'_, '_>,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    if let Some(v) = h.param(0) {
        out.write(&serde_json::to_string(v.value()).unwrap_or_default())?;
    }
    Ok(())
}

fn handlebars(autoescape: bool) -> Handlebars<'static> {
    let mut hb = Handlebars::new();
    hb.register_helper("json", Box::new(json_helper));
    if !autoescape {
        hb.register_escape_fn(handlebars::no_escape);
    }
    hb
}

fn jinja(autoescape: bool) -> Environment<'static> {
    let mut env = Environment::new();
    let mode = if autoescape { AutoEscape::Html } else { AutoEscape::None };
    env.set_auto_escape_callback(move |_| mode.clone());
    env
}

/// Pre-built template engines, one escaping and one raw per library.
pub struct TemplateEngines {
    handlebars_escaped: Handlebars<'static>,
    handlebars_raw: Handlebars<'static>,
    jinja_escaped: Environment<'static>,
    jinja_raw: Environment<'static>,
}

impl Default for TemplateEngines {
    fn default() -> Self {
        Self {
            handlebars_escaped: handlebars(true),
            handlebars_raw: handlebars(false),
            jinja_escaped: jinja(true),
            jinja_raw: jinja(false),
        }
    }
}

impl fmt::Debug for TemplateEngines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngines").finish_non_exhaustive()
    }
}

impl TemplateEngines {
    /// Creates the engines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `source` against `scope`, returning the engine's error message
    /// on failure.
    pub fn render(
        &self,
        dialect: TemplateDialect,
        source: &str,
        scope: &Value,
        autoescape: bool,
    ) -> Result<String, String> {
        match dialect {
            TemplateDialect::Mustache | TemplateDialect::Handlebars => {
                let source = if dialect == TemplateDialect::Handlebars {
                    strip_root_sigils(source, |name| is_unbound_data_var(scope, name))
                } else {
                    strip_root_sigils(source, |_| false)
                };
                let hb = if autoescape {
                    &self.handlebars_escaped
                } else {
                    &self.handlebars_raw
                };
                hb.render_template(&source, scope).map_err(|e| e.to_string())
            }
            TemplateDialect::Nunjucks => {
                let source = strip_root_sigils(source, |_| false);
                let env = if autoescape {
                    &self.jinja_escaped
                } else {
                    &self.jinja_raw
                };
                env.render_str(&source, scope).map_err(|e| e.to_string())
            }
        }
    }
}
