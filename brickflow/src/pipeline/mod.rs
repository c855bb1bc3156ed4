//! Pipeline definitions and the engine that runs them.

mod config;
mod engine;
mod options;
mod validation;


pub use config::{BrickConfig, Pipeline, RootMode};
pub use engine::{EngineBuilder, PipelineEngine};
pub use options::RunOptions;
pub use validation::InputValidator;
