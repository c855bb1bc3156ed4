//! # Brickflow
//!
//! An execution engine for declarative brick pipelines.
//!
//! A pipeline is an ordered list of steps. Each step names a registered
//! brick and a config of expressions. The engine renders that config against
//! the context built by earlier steps, runs the brick and binds its output
//! for the steps that follow. It provides:
//!
//! - **Expression rendering**: variables, optional chains and templates
//! - **Control-flow bricks**: run, retry, if-else, try-except, for-each and map
//! - **Tracing**: enter, exit and skip events for every step, keyed by branch
//! - **Detached runs**: fire-and-forget bodies with tracked failures
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brickflow::prelude::*;
//!
//! let pipeline = Pipeline::from_json(r#"[
//!     {"id": "@acme/fetch", "outputKey": "page"},
//!     {"id": "@acme/summarize", "config": {
//!         "text": {"__type__": "var", "__value__": "@page.body"}
//!     }}
//! ]"#)?;
//!
//! let engine = PipelineEngine::builder().config(EngineConfig::from_env()?).build();
//! let output = engine
//!     .run(&pipeline, Context::new().with_input(input), RunOptions::new())
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod bricks;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod expression;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod subpipeline;
pub mod testing;
pub mod trace;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bricks::{Brick, BrickArgs, BrickOptions, FnBrick, RunMeta};
    pub use crate::config::EngineConfig;
    pub use crate::context::Context;
    pub use crate::core::{
        Branch, BranchPath, BrickId, BrickKind, ElementRef, ElementResolver, OutputKey, Root,
        StepStatus,
    };
    pub use crate::errors::{
        BrickNotFoundError, BrickflowError, BusinessError, ErrorInfo, ErrorKind,
        InputRenderError, InvalidInputError,
    };
    pub use crate::expression::{Expression, ExpressionRenderer, RenderOptions, TemplateDialect};
    pub use crate::observability::{init_tracing, BrickLogger};
    pub use crate::pipeline::{BrickConfig, Pipeline, PipelineEngine, RootMode, RunOptions};
    pub use crate::registry::{get_brick_registry, register_bricks, BrickRegistry};
    pub use crate::subpipeline::{DetachedRunTracker, PipelineRunner};
    pub use crate::trace::{
        CollectingTraceRecorder, LoggingTraceRecorder, NoOpTraceRecorder, TraceRecorder,
    };
    pub use crate::utils::{generate_uuid, is_truthy, iso_timestamp, Timestamp};
}
