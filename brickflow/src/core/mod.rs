//! Core domain model types for brickflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Validated identifiers for bricks and output keys
//! - Brick capability kinds and step states
//! - Branch paths for nested control flow
//! - Root element handles

mod branch;
mod ids;
mod root;
mod status;

pub use branch::{Branch, BranchPath};
pub use ids::{BrickId, OutputKey};
pub use root::{ElementRef, ElementResolver, ReferenceResolver, Root};
pub use status::{BrickKind, StepStatus};
