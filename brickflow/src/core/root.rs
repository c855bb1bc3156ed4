//! Root element handles.
//!
//! The engine never touches a DOM. A root is an opaque handle that root-aware
//! bricks hand back to whatever host owns the page.

use crate::errors::BusinessError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to an element owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(String);

impl ElementRef {
    /// Wraps a host element reference.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the raw reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The anchor a root-aware brick operates against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "ref", rename_all = "snake_case")]
pub enum Root {
    /// The whole document.
    #[default]
    Document,
    /// A specific element.
    Element(ElementRef),
}

impl Root {
    /// Returns the element reference, if this root is an element.
    #[must_use]
    pub fn element(&self) -> Option<&ElementRef> {
        match self {
            Self::Document => None,
            Self::Element(element) => Some(element),
        }
    }
}

/// Resolves a step's rendered `root` value for `rootMode: "element"`.
pub trait ElementResolver: Send + Sync + fmt::Debug {
    /// Resolves `reference` relative to the pipeline's current root.
    ///
    /// # Errors
    ///
    /// Returns `BusinessError` when the reference does not name an element.
    fn resolve(
        &self,
        current: &Root,
        reference: &serde_json::Value,
    ) -> Result<Root, BusinessError>;
}

/// Default resolver: element references are passed around as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceResolver;

impl ElementResolver for ReferenceResolver {
    fn resolve(
        &self,
        _current: &Root,
        reference: &serde_json::Value,
    ) -> Result<Root, BusinessError> {
        match reference {
            serde_json::Value::String(value) if !value.trim().is_empty() => {
                Ok(Root::Element(ElementRef::new(value.trim())))
            }
            serde_json::Value::Null => Err(BusinessError::new("No active element")),
            other => Err(BusinessError::new(format!(
                "Invalid element reference: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_resolver() {
        let resolver = ReferenceResolver;

        let root = resolver.resolve(&Root::Document, &json!("el-42")).unwrap();
        assert_eq!(root.element().map(ElementRef::as_str), Some("el-42"));

        let err = resolver.resolve(&Root::Document, &json!(null)).unwrap_err();
        assert_eq!(err.message, "No active element");

        assert!(resolver.resolve(&Root::Document, &json!(7)).is_err());
        assert!(resolver.resolve(&Root::Document, &json!("  ")).is_err());
    }

    #[test]
    fn test_root_serde() {
        let root = Root::Element(ElementRef::new("el-1"));
        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json, json!({"type": "element", "ref": "el-1"}));

        let json = serde_json::to_value(Root::Document).unwrap();
        assert_eq!(json, json!({"type": "document"}));
    }
}
