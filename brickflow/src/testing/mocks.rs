//! Mock bricks for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::bricks::{Brick, BrickArgs, BrickOptions};
use crate::core::BrickId;
use crate::errors::{BrickflowError, BusinessError};

/// Id of [`EchoBrick`].
pub const ECHO_BRICK_ID: &str = "@test/echo";
/// Id of the [`FailingBrick`] registered by [`TestEngine`](super::TestEngine).
pub const FAILING_BRICK_ID: &str = "@test/fail";

/// Returns its arguments unchanged and records every call.
///
/// Clones share the call log.
#[derive(Debug, Clone)]
pub struct EchoBrick {
    id: BrickId,
    calls: Arc<Mutex<Vec<Value>>>,
}

impl EchoBrick {
    /// Creates the brick under [`ECHO_BRICK_ID`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: BrickId::from_static(ECHO_BRICK_ID),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the arguments of each call, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Clears the call log.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

impl Default for EchoBrick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for EchoBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    fn is_pure(&self) -> bool {
        true
    }

    async fn run(&self, args: BrickArgs, _options: &BrickOptions) -> Result<Value, BrickflowError> {
        let value = args.into_value();
        self.calls.lock().push(value.clone());
        Ok(value)
    }
}

/// Always returns the same value.
#[derive(Debug, Clone)]
pub struct ConstantBrick {
    id: BrickId,
    value: Value,
}

impl ConstantBrick {
    /// Creates a constant brick.
    #[must_use]
    pub fn new(id: &'static str, value: Value) -> Self {
        Self {
            id: BrickId::from_static(id),
            value,
        }
    }
}

#[async_trait]
impl Brick for ConstantBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    fn is_pure(&self) -> bool {
        true
    }

    async fn run(&self, _args: BrickArgs, _options: &BrickOptions) -> Result<Value, BrickflowError> {
        Ok(self.value.clone())
    }
}

/// Always fails with a business error.
#[derive(Debug, Clone)]
pub struct FailingBrick {
    id: BrickId,
    message: String,
}

impl FailingBrick {
    /// Creates a failing brick.
    #[must_use]
    pub fn new(id: &'static str, message: impl Into<String>) -> Self {
        Self {
            id: BrickId::from_static(id),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Brick for FailingBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    async fn run(&self, _args: BrickArgs, _options: &BrickOptions) -> Result<Value, BrickflowError> {
        Err(BusinessError::new(self.message.clone()).into())
    }
}

/// Fails its first `failures` calls, then returns `{"attempt": n}`.
///
/// Each failure reads `Flaky failure <n>`, where `n` is the 1-based call
/// number. Clones share the call counter.
#[derive(Debug, Clone)]
pub struct FlakyBrick {
    id: BrickId,
    failures: usize,
    calls: Arc<AtomicUsize>,
}

impl FlakyBrick {
    /// Creates a flaky brick.
    #[must_use]
    pub fn new(id: &'static str, failures: usize) -> Self {
        Self {
            id: BrickId::from_static(id),
            failures,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Brick for FlakyBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    async fn run(&self, _args: BrickArgs, _options: &BrickOptions) -> Result<Value, BrickflowError> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(BusinessError::new(format!("Flaky failure {attempt}")).into());
        }
        Ok(json!({"attempt": attempt}))
    }
}

/// Counts its calls and returns the running count.
#[derive(Debug, Clone)]
pub struct CountingBrick {
    id: BrickId,
    count: Arc<AtomicUsize>,
}

impl CountingBrick {
    /// Creates a counting brick.
    #[must_use]
    pub fn new(id: &'static str) -> Self {
        Self {
            id: BrickId::from_static(id),
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the number of calls so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Brick for CountingBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    async fn run(&self, _args: BrickArgs, _options: &BrickOptions) -> Result<Value, BrickflowError> {
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({"count": count}))
    }
}

/// Never completes.
#[derive(Debug, Clone)]
pub struct PendingBrick {
    id: BrickId,
}

impl PendingBrick {
    /// Creates a pending brick.
    #[must_use]
    pub fn new(id: &'static str) -> Self {
        Self {
            id: BrickId::from_static(id),
        }
    }
}

#[async_trait]
impl Brick for PendingBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    async fn run(&self, _args: BrickArgs, _options: &BrickOptions) -> Result<Value, BrickflowError> {
        futures::future::pending().await
    }
}

/// Panics when run.
#[derive(Debug, Clone)]
pub struct PanickingBrick {
    id: BrickId,
}

impl PanickingBrick {
    /// Creates a panicking brick.
    #[must_use]
    pub fn new(id: &'static str) -> Self {
        Self {
            id: BrickId::from_static(id),
        }
    }
}

#[async_trait]
impl Brick for PanickingBrick {
    fn id(&self) -> &BrickId {
        &self.id
    }

    async fn run(&self, _args: BrickArgs, _options: &BrickOptions) -> Result<Value, BrickflowError> {
        panic!("{} panicked", self.id)
    }
}
