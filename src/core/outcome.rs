//! Outcome - the uniform result of every operation and pipeline run

use crate::core::env::DEFAULT_DESCRIPTION;
use crate::core::error::{render_operation_failure, CapturedError};
use crate::core::payload::Payload;
use crate::core::trace::Trace;
use serde::Serialize;

/// Exit code reported on success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code used when a failure carries none of its own
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Failure {
    exit_code: i32,
    error: CapturedError,
    message: String,
}

/// Result of running an operation or a pipeline
///
/// Either a success, with no error and an empty message, or a failure with a
/// nonzero exit code, the captured error and its formatted message. The payload
/// is always a sequence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    payload: Payload,
    #[serde(flatten)]
    failure: Option<Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<Box<Trace>>,
}

impl Outcome {
    pub fn success(payload: Payload) -> Self {
        Self {
            payload,
            failure: None,
            trace: None,
        }
    }

    /// A failed outcome
    ///
    /// An exit code of 0 is bumped to 1, and an empty message is replaced by
    /// the standard failure message of an undescribed operation.
    pub fn failure(payload: Payload, exit_code: i32, error: CapturedError, message: String) -> Self {
        let exit_code = if exit_code == EXIT_SUCCESS {
            EXIT_FAILURE
        } else {
            exit_code
        };
        let message = if message.trim().is_empty() {
            render_operation_failure(&error, DEFAULT_DESCRIPTION, exit_code)
        } else {
            message
        };
        Self {
            payload,
            failure: Some(Failure {
                exit_code,
                error,
                message,
            }),
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(Box::new(trace));
        self
    }

    pub(crate) fn without_trace(mut self) -> Self {
        self.trace = None;
        self
    }

    pub(crate) fn take_trace(&mut self) -> Option<Trace> {
        self.trace.take().map(|trace| *trace)
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        self.failure
            .as_ref()
            .map_or(EXIT_SUCCESS, |failure| failure.exit_code)
    }

    /// The captured error, `None` on success
    pub fn error(&self) -> Option<&CapturedError> {
        self.failure.as_ref().map(|failure| &failure.error)
    }

    /// Formatted failure message, empty on success
    pub fn error_message(&self) -> &str {
        self.failure
            .as_ref()
            .map_or("", |failure| failure.message.as_str())
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_deref()
    }
}
