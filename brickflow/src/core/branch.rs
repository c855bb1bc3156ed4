//! Branch paths addressing nested control-flow executions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One level of nesting: which body of a control-flow brick, and which pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Branch {
    /// The body name, e.g. `branch`, `if`, `except`.
    pub key: String,
    /// The pass through that body, starting at 0.
    pub counter: usize,
}

impl Branch {
    /// Creates a new branch entry.
    #[must_use]
    pub fn new(key: impl Into<String>, counter: usize) -> Self {
        Self {
            key: key.into(),
            counter,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.counter)
    }
}

/// The position of an execution inside nested control-flow bricks.
///
/// Only used to correlate traces; it never affects variable resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchPath(Vec<Branch>);

impl BranchPath {
    /// Creates the empty path of a top-level run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new path with `branch` appended.
    #[must_use]
    pub fn push(&self, branch: Branch) -> Self {
        let mut entries = self.0.clone();
        entries.push(branch);
        Self(entries)
    }

    /// Returns the nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Returns true for a top-level run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the innermost entry.
    #[must_use]
    pub fn last(&self) -> Option<&Branch> {
        self.0.last()
    }

    /// Iterates entries from outermost to innermost.
    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.0.iter()
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, branch) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            write!(f, "{branch}")?;
        }
        Ok(())
    }
}

impl FromIterator<Branch> for BranchPath {
    fn from_iter<T: IntoIterator<Item = Branch>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
