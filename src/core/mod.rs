//! Core data model for operation pipelines
//!
//! The uniform result type, the values threaded between steps, the settings
//! steps run with, the error types and the trace record.

pub mod config;
pub mod env;
pub mod error;
pub mod outcome;
pub mod payload;
pub mod trace;

pub use config::*;
pub use env::*;
pub use error::*;
pub use outcome::*;
pub use payload::*;
pub use trace::*;
