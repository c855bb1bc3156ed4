//! Testing utilities for brickflow pipelines.
//!
//! This module provides:
//! - Mock bricks
//! - An engine harness with a collecting trace recorder
//! - Trace assertions

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_balanced, assert_entered, assert_failed_with, assert_no_records};
pub use fixtures::TestEngine;
pub use mocks::{
    ConstantBrick, CountingBrick, EchoBrick, FailingBrick, FlakyBrick, PanickingBrick,
    PendingBrick, ECHO_BRICK_ID, FAILING_BRICK_ID,
};
