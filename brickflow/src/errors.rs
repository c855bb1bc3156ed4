//! Error types for the brickflow engine.
//!
//! Errors are split by attribution: rendering and validation failures belong
//! to whoever authored the pipeline, a missing brick is a configuration
//! problem, and business errors are raised on purpose by bricks. Anything
//! else a brick throws travels as [`BrickflowError::Unexpected`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The main error type for brickflow operations.
#[derive(Debug, Error)]
pub enum BrickflowError {
    /// An expression failed to render.
    #[error("{0}")]
    InputRender(#[from] InputRenderError),

    /// Rendered arguments failed schema validation.
    #[error("{0}")]
    InvalidInput(#[from] InvalidInputError),

    /// A step referenced a brick that is not registered.
    #[error("{0}")]
    BrickNotFound(#[from] BrickNotFoundError),

    /// A brick reported an expected, user-facing failure.
    #[error("{0}")]
    Business(#[from] BusinessError),

    /// A brick id or output key was malformed.
    #[error("{0}")]
    Identifier(#[from] IdentifierError),

    /// Engine configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure raised by a brick implementation.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Coarse classification of a [`BrickflowError`], used in traces and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`InputRenderError`].
    InputRender,
    /// See [`InvalidInputError`].
    InvalidInput,
    /// See [`BrickNotFoundError`].
    BrickNotFound,
    /// See [`BusinessError`].
    Business,
    /// Everything else.
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputRender => write!(f, "input_render"),
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::BrickNotFound => write!(f, "brick_not_found"),
            Self::Business => write!(f, "business"),
            Self::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Serializable summary of an error, as handed to trace recorders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// The error classification.
    pub kind: ErrorKind,
    /// The human-readable message.
    pub message: String,
    /// The offending field, for rendering and validation errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl BrickflowError {
    /// Creates an unexpected error from a message.
    pub fn unexpected(message: impl fmt::Display) -> Self {
        Self::Unexpected(anyhow::anyhow!("{message}"))
    }

    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputRender(_) => ErrorKind::InputRender,
            Self::InvalidInput(_) | Self::Identifier(_) | Self::Serialization(_) => {
                ErrorKind::InvalidInput
            }
            Self::BrickNotFound(_) => ErrorKind::BrickNotFound,
            Self::Business(_) => ErrorKind::Business,
            Self::Configuration(_) | Self::Io(_) | Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Returns true for errors no control-flow brick should retry or catch.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BrickNotFound(_))
    }

    /// Converts to the summary recorded in traces.
    #[must_use]
    pub fn to_trace_info(&self) -> ErrorInfo {
        let field = match self {
            Self::InputRender(err) => Some(err.field().to_string()),
            Self::InvalidInput(err) => err.field.clone(),
            _ => None,
        };
        ErrorInfo {
            kind: self.kind(),
            message: self.to_string(),
            field,
        }
    }
}

/// Raised when an expression cannot be resolved against the context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputRenderError {
    /// A non-optional variable path did not resolve.
    #[error("Variable '{path}' not found (field '{field}')")]
    MissingVariable {
        /// The variable path as written.
        path: String,
        /// The config field being rendered.
        field: String,
    },

    /// A variable path could not be parsed.
    #[error("Invalid variable path '{path}' (field '{field}'): {message}")]
    InvalidPath {
        /// The variable path as written.
        path: String,
        /// The config field being rendered.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// The template engine rejected or failed on a template.
    #[error("Error rendering {dialect} template in field '{field}': {message}")]
    Template {
        /// The template dialect tag.
        dialect: String,
        /// The template source.
        template: String,
        /// The config field being rendered.
        field: String,
        /// The engine's error message.
        message: String,
    },

    /// An opaque expression could not be serialized back to JSON.
    #[error("Error serializing expression in field '{field}': {message}")]
    Serialization {
        /// The config field being rendered.
        field: String,
        /// The serializer's error message.
        message: String,
    },
}

impl InputRenderError {
    /// Returns the config field the error is attributed to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::MissingVariable { field, .. }
            | Self::InvalidPath { field, .. }
            | Self::Template { field, .. }
            | Self::Serialization { field, .. } => field,
        }
    }

    /// Returns true if this is a missing-variable error.
    #[must_use]
    pub fn is_missing_variable(&self) -> bool {
        matches!(self, Self::MissingVariable { .. })
    }
}

/// Raised when rendered arguments do not satisfy a brick's input schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid inputs{}: {}", brick_id.as_ref().map(|id| format!(" for brick '{id}'")).unwrap_or_default(), errors.join("; "))]
pub struct InvalidInputError {
    /// The brick whose schema rejected the arguments.
    pub brick_id: Option<String>,
    /// The field at fault, when known.
    pub field: Option<String>,
    /// Individual validation messages.
    pub errors: Vec<String>,
}

impl InvalidInputError {
    /// Creates a validation error for a brick.
    #[must_use]
    pub fn new(brick_id: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            brick_id: Some(brick_id.into()),
            field: None,
            errors,
        }
    }

    /// Creates a validation error for a single argument field.
    #[must_use]
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            brick_id: None,
            errors: vec![format!("{field}: {}", message.into())],
            field: Some(field),
        }
    }
}

/// Raised when a step references an unregistered brick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Brick not found: {id}")]
pub struct BrickNotFoundError {
    /// The unknown brick id.
    pub id: String,
}

impl BrickNotFoundError {
    /// Creates a new brick-not-found error.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A failure a brick raises intentionally, surfaced to the end user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BusinessError {
    /// The user-facing message.
    pub message: String,
}

impl BusinessError {
    /// Creates a new business error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error a retry loop reports when it ends without a captured error.
    #[must_use]
    pub fn max_retries_exceeded() -> Self {
        Self::new("Maximum retries exceeded")
    }
}

/// Raised when a brick id or identifier does not match its grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {expected}: '{value}'")]
pub struct IdentifierError {
    /// The rejected value.
    pub value: String,
    /// What the value was supposed to be.
    pub expected: &'static str,
}

impl IdentifierError {
    /// Creates a new identifier error.
    #[must_use]
    pub fn new(value: impl Into<String>, expected: &'static str) -> Self {
        Self {
            value: value.into(),
            expected,
        }
    }
}
