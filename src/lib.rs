//! npm-super-pack - back up npm packages with their dependencies for offline installation
//!
//! The run is built on a small operation/pipeline library: operations wrap
//! fallible units of work into a uniform [`Outcome`], pipelines chain them
//! with per-step fallbacks and can record a [`Trace`] of what happened.

pub mod backup;
pub mod cli;
pub mod core;
pub mod execution;
pub mod files;
pub mod npm;
pub mod prompt;
pub mod sanitize;

// Re-export commonly used types
pub use crate::core::{
    CapturedError, EnvOverrides, EnvSettings, ExitCodeError, IntoPayload, Outcome, Payload, PipelineEnv,
    PipelineError, Trace,
};
pub use crate::execution::{curry, run_operation, LockedPipeline, OpCaller, Operation, OpsPipeline};
pub use crate::npm::{NpmClient, PackageManager};
