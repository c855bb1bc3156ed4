//! The variable environment pipelines are evaluated against.
//!
//! A [`Context`] is an immutable chain of overlay frames. Binding a root
//! returns a new context that shares every earlier frame with its parent, so
//! handing a context to a step can never let that step change what earlier or
//! sibling steps observe.

use crate::core::OutputKey;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Root holding the mod component's input.
pub const INPUT_ROOT: &str = "@input";

/// Root holding the mod's configured options.
pub const OPTIONS_ROOT: &str = "@options";

#[derive(Debug)]
struct Frame {
    key: String,
    value: serde_json::Value,
    parent: Option<Arc<Frame>>,
}

/// An immutable, progressively extended mapping from root names to values.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Frame>>,
    frames: usize,
}

/// Normalizes a root name to its `@`-prefixed form.
fn root_name(key: &str) -> String {
    if key.starts_with('@') {
        key.to_string()
    } else {
        format!("@{key}")
    }
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context from root bindings, in order.
    #[must_use]
    pub fn from_roots<K, I>(roots: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, serde_json::Value)>,
    {
        roots
            .into_iter()
            .fold(Self::new(), |ctx, (key, value)| ctx.with_binding(key.as_ref(), value))
    }

    /// Binds `@input`.
    #[must_use]
    pub fn with_input(&self, input: serde_json::Value) -> Self {
        self.with_binding(INPUT_ROOT, input)
    }

    /// Binds `@options`.
    #[must_use]
    pub fn with_options(&self, options: serde_json::Value) -> Self {
        self.with_binding(OPTIONS_ROOT, options)
    }

    /// Returns a new context with `key` bound to `value`.
    ///
    /// The key is normalized to start with `@`. An existing binding with the
    /// same name is shadowed, not replaced; `self` is left untouched.
    #[must_use]
    pub fn with_binding(&self, key: &str, value: serde_json::Value) -> Self {
        Self {
            head: Some(Arc::new(Frame {
                key: root_name(key),
                value,
                parent: self.head.clone(),
            })),
            frames: self.frames + 1,
        }
    }

    /// Returns a new context with a step output bound under its key.
    #[must_use]
    pub fn with_output(&self, key: &OutputKey, value: serde_json::Value) -> Self {
        self.with_binding(&key.context_key(), value)
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.head.as_deref(), |frame| frame.parent.as_deref())
    }

    /// Looks up a root by name, with or without the leading `@`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        let key = key.strip_prefix('@').unwrap_or(key);
        self.frames()
            .find(|frame| &frame.key[1..] == key)
            .map(|frame| &frame.value)
    }

    /// Returns true if the root is bound.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the number of frames, counting shadowed bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Returns the visible root names, oldest binding first.
    #[must_use]
    pub fn roots(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names: Vec<String> = self
            .frames()
            .filter(|frame| seen.insert(frame.key.as_str()))
            .map(|frame| frame.key.clone())
            .collect();
        names.reverse();
        names
    }

    /// Materializes the visible bindings as a JSON object keyed by `@root`.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        self.materialize(|key| key.to_string())
    }

    /// Materializes the visible bindings with bare root names, the shape
    /// template engines bind against.
    #[must_use]
    pub fn to_template_scope(&self) -> serde_json::Value {
        self.materialize(|key| key[1..].to_string())
    }

    fn materialize(&self, name: impl Fn(&str) -> String) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.frames);
        for frame in self.frames() {
            let key = name(&frame.key);
            if !map.contains_key(&key) {
                map.insert(key, frame.value.clone());
            }
        }
        serde_json::Value::Object(map)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("roots", &self.roots())
            .field("frames", &self.frames)
            .finish()
    }
}

impl Serialize for Context {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        // Unwind uniquely owned frames iteratively so long chains cannot
        // overflow the stack through recursive Arc drops.
        let mut next = self.head.take();
        while let Some(frame) = next {
            match Arc::try_unwrap(frame) {
                Ok(mut frame) => next = frame.parent.take(),
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
