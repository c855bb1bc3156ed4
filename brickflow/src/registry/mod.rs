//! Brick registry.
//!
//! Maps brick ids to shared brick instances. Registration happens up front;
//! lookups happen once per step, so the map sits behind a read-mostly lock.

use crate::bricks::control_flow::builtin_bricks;
use crate::bricks::Brick;
use crate::core::BrickId;
use crate::errors::BrickNotFoundError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Registry of runnable bricks.
#[derive(Default)]
pub struct BrickRegistry {
    bricks: RwLock<HashMap<BrickId, Arc<dyn Brick>>>,
}

impl BrickRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in control-flow bricks.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(builtin_bricks());
        registry
    }

    /// Registers bricks, replacing any with the same id.
    pub fn register<I>(&self, bricks: I)
    where
        I: IntoIterator<Item = Arc<dyn Brick>>,
    {
        let mut map = self.bricks.write();
        for brick in bricks {
            let id = brick.id().clone();
            if map.insert(id.clone(), brick).is_some() {
                tracing::debug!(brick_id = %id, "Replaced registered brick");
            }
        }
    }

    /// Registers a single brick.
    pub fn register_one(&self, brick: impl Brick + 'static) {
        self.register([Arc::new(brick) as Arc<dyn Brick>]);
    }

    /// Looks up a brick.
    pub fn lookup(&self, id: &BrickId) -> Result<Arc<dyn Brick>, BrickNotFoundError> {
        self.bricks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| BrickNotFoundError::new(id.as_str()))
    }

    /// Returns true if a brick is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &BrickId) -> bool {
        self.bricks.read().contains_key(id)
    }

    /// Returns the registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<BrickId> {
        let mut ids: Vec<_> = self.bricks.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of registered bricks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bricks.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bricks.read().is_empty()
    }

    /// Removes every brick.
    pub fn clear(&self) {
        self.bricks.write().clear();
    }
}

impl std::fmt::Debug for BrickRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrickRegistry")
            .field("bricks", &self.ids())
            .finish()
    }
}

/// The process-wide default registry, seeded with the built-in bricks.
static BRICK_REGISTRY: LazyLock<Arc<BrickRegistry>> =
    LazyLock::new(|| Arc::new(BrickRegistry::with_builtins()));

/// Returns the process-wide registry.
pub fn get_brick_registry() -> Arc<BrickRegistry> {
    Arc::clone(&BRICK_REGISTRY)
}

/// Registers bricks in the process-wide registry.
pub fn register_bricks<I>(bricks: I)
where
    I: IntoIterator<Item = Arc<dyn Brick>>,
{
    BRICK_REGISTRY.register(bricks);
}

/// Empties the process-wide registry, built-ins included.
pub fn clear_brick_registry() {
    BRICK_REGISTRY.clear();
}
