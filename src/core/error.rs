//! Error types and the fixed failure message format

use serde::{Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// An error caught while running an operation or a pipeline
///
/// Holds the original error together with the name of its type, which the
/// failure message reports on its first line.
#[derive(Debug, Clone)]
pub struct CapturedError {
    name: &'static str,
    inner: Arc<anyhow::Error>,
}

impl CapturedError {
    /// Capture an error, naming it after its type
    pub fn new<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::named(type_label::<E>(), error.into())
    }

    /// Capture an already converted error under an explicit name
    pub fn named(name: &'static str, error: anyhow::Error) -> Self {
        Self {
            name,
            inner: Arc::new(error),
        }
    }

    /// Placeholder for a panic, whose payload is not an error
    pub(crate) fn from_panic(panic: Box<dyn Any + Send>) -> Self {
        let rendering = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<opaque panic payload>".to_string());
        Self::new(NonErrorThrown { rendering })
    }

    /// Name of the error type
    pub fn name(&self) -> &str {
        self.name
    }

    /// Attempt to view the captured error as a concrete type
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Exit code carried anywhere in the error chain
    pub fn exit_code(&self) -> Option<i32> {
        self.inner
            .chain()
            .find_map(|cause| cause.downcast_ref::<ExitCodeError>())
            .map(ExitCodeError::code)
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = format!("{:#}", self.inner);
        if message.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, message)
        }
    }
}

// Display already renders the whole inner chain, so no source is exposed.
impl std::error::Error for CapturedError {}

impl Serialize for CapturedError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An error that carries a process-style exit code
///
/// Operations running with `use_shell` report this code as their exit code
/// when it is found anywhere in the error chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitCodeError {
    code: i32,
    message: String,
}

impl ExitCodeError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

impl fmt::Display for ExitCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "exited with code {}", self.code)
        } else {
            write!(f, "exited with code {}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ExitCodeError {}

/// Stand-in for a failure that was not an error value (a panic)
#[derive(Debug, Clone, Error)]
#[error("a non-error value was thrown: {rendering}")]
pub struct NonErrorThrown {
    pub rendering: String,
}

/// Why a pipeline stopped before the end of its queue
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Operations Pipeline had an unrecoverable failure: The main Operation failed, and there was no fallback Operation for it.")]
    NoFallback {
        step: String,
        #[source]
        cause: CapturedError,
    },

    #[error("Operations Pipeline had an unrecoverable failure: The main Operation failed, and every fallback Operation for it also failed.")]
    FallbacksExhausted {
        step: String,
        attempted: usize,
        #[source]
        cause: CapturedError,
    },
}

impl PipelineError {
    /// Description of the queue entry that failed
    pub fn step(&self) -> &str {
        match self {
            PipelineError::NoFallback { step, .. } => step,
            PipelineError::FallbacksExhausted { step, .. } => step,
        }
    }

    /// The error of the last step that ran
    pub fn cause(&self) -> &CapturedError {
        match self {
            PipelineError::NoFallback { cause, .. } => cause,
            PipelineError::FallbacksExhausted { cause, .. } => cause,
        }
    }
}

/// Four-line message for a failed operation
pub fn render_operation_failure(error: &CapturedError, description: &str, exit_code: i32) -> String {
    format!(
        "ERROR! Error type: {}\nName of the Operation that failed: \"{}\"\nError exit code: {}\nError output: {}",
        error.name(),
        description,
        exit_code,
        error
    )
}

/// Header for a failed pipeline followed by the indented message of the step that failed
///
/// Nested pipelines produce one header per enclosing pipeline, each one
/// indented a level further.
pub fn render_pipeline_failure(
    error: &CapturedError,
    description: &str,
    exit_code: i32,
    inner_message: &str,
) -> String {
    let mut message = format!(
        "ERROR! Error type: {}\nName of the Operation Pipeline that failed: \"{}\"\nError exit code: {}\nError output: {}",
        error.name(),
        description,
        exit_code,
        error
    );
    for line in inner_message.lines() {
        message.push_str("\n    ");
        message.push_str(line);
    }
    message
}

/// Last path segment of a type name, without generics
pub(crate) fn type_label<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
