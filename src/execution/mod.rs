//! Running operations and pipelines

pub mod operation;
pub mod pipeline;

pub use operation::{curry, run_operation, OpCaller, Operation};
pub use pipeline::{IntoStep, LockedPipeline, OpsPipeline, OutlineItem, Step};
