//! Variable path parsing and resolution.
//!
//! Grammar: `@root` followed by `.name`, `[0]`, `["key"]` or `['key']`
//! segments. Any segment, the root included, may carry a trailing `?`: if
//! its value is missing or null the whole path resolves to undefined.

use crate::context::Context;
use serde_json::Value;
use std::fmt;

/// How a single segment addresses its parent value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKey {
    /// An object property, or a numeric array index written with a dot.
    Field(String),
    /// A bracketed array index.
    Index(usize),
}

/// One step of a [`VarPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// What to look up.
    pub key: SegmentKey,
    /// Whether the segment was marked with `?`.
    pub optional: bool,
}

/// A parsed variable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarPath {
    /// Root name without the leading `@`.
    pub root: String,
    /// Whether the root was marked with `?`.
    pub root_optional: bool,
    /// Segments after the root.
    pub segments: Vec<PathSegment>,
}

/// Outcome of resolving a [`VarPath`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    /// The path resolved to a value, possibly `null`.
    Value(&'a Value),
    /// An optional segment short-circuited.
    Undefined,
    /// A non-optional segment was missing.
    Missing,
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '.' | '[' | ']' | '?')
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl Cursor<'_> {
    fn name(&mut self) -> String {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if is_delimiter(c) || c.is_whitespace() {
                break;
            }
            out.push(c);
            self.chars.next();
        }
        out
    }

    fn optional(&mut self) -> bool {
        self.chars.next_if_eq(&'?').is_some()
    }

    fn bracket(&mut self) -> Result<SegmentKey, String> {
        let key = match self.chars.peek() {
            Some(&quote @ ('"' | '\'')) => {
                self.chars.next();
                let mut out = String::new();
                loop {
                    match self.chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => out.push(c),
                        None => return Err("unterminated quoted key".to_string()),
                    }
                }
                SegmentKey::Field(out)
            }
            _ => {
                let mut digits = String::new();
                while let Some(c) = self.chars.next_if(char::is_ascii_digit) {
                    digits.push(c);
                }
                let index = digits
                    .parse()
                    .map_err(|_| "expected an index or quoted key inside []".to_string())?;
                SegmentKey::Index(index)
            }
        };
        match self.chars.next() {
            Some(']') => Ok(key),
            _ => Err("expected ']'".to_string()),
        }
    }
}

impl VarPath {
    /// Parses a path such as `@input.items[0]?.name`.
    pub fn parse(path: &str) -> Result<Self, String> {
        let path = path.trim();
        let rest = path
            .strip_prefix('@')
            .ok_or_else(|| "path must start with '@'".to_string())?;

        let mut cursor = Cursor {
            chars: rest.chars().peekable(),
        };
        let root = cursor.name();
        if root.is_empty() {
            return Err("missing root name".to_string());
        }
        let root_optional = cursor.optional();

        let mut segments = Vec::new();
        while let Some(c) = cursor.chars.next() {
            let key = match c {
                '.' => {
                    let name = cursor.name();
                    if name.is_empty() {
                        return Err("empty property name".to_string());
                    }
                    SegmentKey::Field(name)
                }
                '[' => cursor.bracket()?,
                other => return Err(format!("unexpected character '{other}'")),
            };
            segments.push(PathSegment {
                key,
                optional: cursor.optional(),
            });
        }

        Ok(Self {
            root,
            root_optional,
            segments,
        })
    }

    /// Resolves the path against a context.
    #[must_use]
    pub fn resolve<'a>(&self, ctx: &'a Context) -> Resolved<'a> {
        let mut current = match ctx.get(&self.root) {
            None | Some(Value::Null) if self.root_optional => return Resolved::Undefined,
            None => return Resolved::Missing,
            Some(value) => value,
        };

        for segment in &self.segments {
            match lookup(current, &segment.key) {
                None | Some(Value::Null) if segment.optional => return Resolved::Undefined,
                None => return Resolved::Missing,
                Some(value) => current = value,
            }
        }
        Resolved::Value(current)
    }
}

fn lookup<'a>(value: &'a Value, key: &SegmentKey) -> Option<&'a Value> {
    match (value, key) {
        (Value::Object(map), SegmentKey::Field(name)) => map.get(name),
        (Value::Object(map), SegmentKey::Index(index)) => map.get(&index.to_string()),
        (Value::Array(items), SegmentKey::Index(index)) => items.get(*index),
        (Value::Array(items), SegmentKey::Field(name)) => {
            name.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    }
}

impl fmt::Display for VarPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.root)?;
        if self.root_optional {
            f.write_str("?")?;
        }
        for segment in &self.segments {
            match &segment.key {
                SegmentKey::Field(name) if name.chars().any(|c| is_delimiter(c) || c.is_whitespace()) => {
                    write!(f, "[{name:?}]")?;
                }
                SegmentKey::Field(name) => write!(f, ".{name}")?,
                SegmentKey::Index(index) => write!(f, "[{index}]")?,
            }
            if segment.optional {
                f.write_str("?")?;
            }
        }
        Ok(())
    }
}
