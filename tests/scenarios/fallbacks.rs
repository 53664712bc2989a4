//! Test: Failure Handling - error capture, fallbacks and aborts

use crate::helpers::*;
use npm_super_pack::core::{EnvOverrides, EnvSettings, ExitCodeError, NonErrorThrown, Payload};
use npm_super_pack::{run_operation, Operation, OpsPipeline, PipelineError};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("tarball is corrupt: {0}")]
struct CorruptTarball(String);

/// The error an operation returns is the error in the outcome
#[tokio::test]
async fn test_error_capture_fidelity() {
    let op = Operation::new(|_input: Payload| Err::<Value, _>(CorruptTarball("left-pad-1.3.0.tgz".to_string())));
    let outcome = run_operation(&op, Payload::empty(), &EnvSettings::new("Verify tarball")).await;

    assert!(!outcome.is_success());
    let error = outcome.error().unwrap();
    let original = error.downcast_ref::<CorruptTarball>().unwrap();
    assert_eq!(original.0, "left-pad-1.3.0.tgz");
    assert!(outcome.error_message().contains("CorruptTarball"));
    assert!(outcome
        .error_message()
        .contains("tarball is corrupt: left-pad-1.3.0.tgz"));
}

/// A panic is replaced by a placeholder error
#[tokio::test]
async fn test_non_error_failure_is_normalised() {
    let op = Operation::map(|_input: Payload| -> Value { std::panic::panic_any(42_i32) });
    let outcome = run_operation(&op, Payload::empty(), &EnvSettings::default()).await;

    let error = outcome.error().unwrap();
    assert_eq!(error.name(), "NonErrorThrown");
    assert!(error.downcast_ref::<NonErrorThrown>().is_some());
    assert!(error.downcast_ref::<i32>().is_none());
}

/// Fallbacks run in order with the input the failed step got
#[tokio::test]
async fn test_fallback_precedence() {
    let log = CallLog::new();
    let input = Payload::new(vec![json!("/tmp/install")]);

    let outcome = OpsPipeline::new("Fallbacks")
        .pipe(append(1), "Prepare")
        .pipe(log.failing("primary", "primary broke"), "Primary")
        .fallback(log.failing("first", "first fallback broke"), "First fallback")
        .fallback(log.succeeding("second", json!("recovered")), "Second fallback")
        .fallback(log.succeeding("third", json!("unused")), "Third fallback")
        .pipe(log.succeeding("after", json!("done")), "After")
        .start(input)
        .await;

    assert!(outcome.is_success());
    assert_eq!(log.names(), vec!["primary", "first", "second", "after"]);

    let expected = Payload::new(vec![json!("/tmp/install"), json!(1)]);
    assert_eq!(log.input_of("primary").unwrap(), expected);
    assert_eq!(log.input_of("first").unwrap(), expected);
    assert_eq!(log.input_of("second").unwrap(), expected);
    assert_eq!(log.input_of("after").unwrap().as_slice(), &[json!("recovered")]);
    assert_eq!(outcome.payload().as_slice(), &[json!("done")]);
}

/// Every fallback failing aborts with the exhaustion message and the last inner message
#[tokio::test]
async fn test_exhausted_fallbacks_abort() {
    let (after, calls) = counter();
    let outcome = OpsPipeline::new("Exhausted")
        .pipe(failing("primary broke"), "Primary")
        .fallback(failing("first fallback broke"), "First fallback")
        .fallback(failing("last fallback broke"), "Last fallback")
        .pipe(after, "After")
        .start(vec![json!(1)])
        .await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let message = outcome.error_message();
    assert!(message.contains("every fallback Operation for it also failed"));
    assert!(message.contains("Name of the Operation Pipeline that failed: \"Exhausted\""));
    assert!(message.contains("    Name of the Operation that failed: \"Last fallback\""));
    assert!(message.contains("last fallback broke"));
    assert!(!message.contains("first fallback broke"));

    let reason = outcome.error().unwrap().downcast_ref::<PipelineError>().unwrap();
    match reason {
        PipelineError::FallbacksExhausted { step, attempted, .. } => {
            assert_eq!(step, "Primary");
            assert_eq!(*attempted, 2);
        }
        other => panic!("unexpected reason: {:?}", other),
    }
    assert!(reason.cause().to_string().contains("last fallback broke"));
}

/// A step without fallbacks stops the queue with the no-fallback message
#[tokio::test]
async fn test_no_fallback_abort() {
    let (after, calls) = counter();
    let outcome = OpsPipeline::new("Strict")
        .pipe(append(2), "Append")
        .pipe(failing("disk full"), "Write")
        .pipe(after, "After")
        .start(vec![json!(1)])
        .await;

    assert!(!outcome.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(outcome.payload().as_slice(), &[json!(1), json!(2)]);

    let message = outcome.error_message();
    assert!(message.starts_with("ERROR! Error type: PipelineError\n"));
    assert!(message.contains("there was no fallback Operation for it"));
    assert!(message.contains("    Error output: Error: disk full"));
    assert!(matches!(
        outcome.error().unwrap().downcast_ref::<PipelineError>(),
        Some(PipelineError::NoFallback { step, .. }) if step == "Write"
    ));
}

/// A shell step reports the exit code its error carries; the pipeline still exits with 1
#[tokio::test]
async fn test_shell_step_exit_code() {
    let exit_with = |code: i32| {
        Operation::new(move |_input: Payload| {
            Err::<Value, _>(anyhow::Error::new(ExitCodeError::new(code, "npm ERR! code E404")))
        })
    };

    let outcome = OpsPipeline::new("Shell")
        .pipe_with(exit_with(127), "Run npm", EnvOverrides::new().shell(true))
        .start(Payload::empty())
        .await;

    assert_eq!(outcome.exit_code(), 1);
    assert!(outcome.error_message().contains("    Error exit code: 127"));

    let recovered = OpsPipeline::new("Shell")
        .pipe_with(exit_with(127), "Run npm", EnvOverrides::new().shell(true))
        .fallback(append(0), "Skip npm")
        .start(Payload::empty())
        .await;
    assert!(recovered.is_success());
    assert_eq!(recovered.payload().as_slice(), &[json!(0)]);
}
