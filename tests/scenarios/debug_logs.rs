//! Test: Debug Logs - failures reported as they happen when use_debug is on

use crate::helpers::*;
use npm_super_pack::core::{EnvOverrides, Payload, PipelineEnv};
use npm_super_pack::OpsPipeline;
use serde_json::json;

/// A failure recovered by a fallback is still logged when it happens
#[tokio::test]
async fn test_recovered_failure_is_logged() {
    let (logs, _guard) = capture_error_logs();

    let outcome = OpsPipeline::with_env(PipelineEnv::new("Recovering").with_debug(true))
        .pipe(failing("primary broke"), "Primary")
        .fallback(append(7), "Repair")
        .start(Payload::empty())
        .await;

    assert!(outcome.is_success());
    let logged = logs.contents();
    assert!(logged.contains("ERROR! Error type: Error"));
    assert!(logged.contains("Name of the Operation that failed: \"Primary\""));
    assert!(logged.contains("Error exit code: 1"));
    assert!(logged.contains("Error output: Error: primary broke"));
    assert!(!logged.contains("Operation Pipeline that failed"));
}

/// An aborted pipeline logs its own header on top of the step failure
#[tokio::test]
async fn test_pipeline_abort_is_logged() {
    let (logs, _guard) = capture_error_logs();

    let outcome = OpsPipeline::with_env(PipelineEnv::new("Strict").with_debug(true))
        .pipe(failing("disk full"), "Write")
        .start(vec![json!(1)])
        .await;

    assert!(!outcome.is_success());
    let logged = logs.contents();
    assert!(logged.contains("Name of the Operation that failed: \"Write\""));
    assert!(logged.contains("Name of the Operation Pipeline that failed: \"Strict\""));
    assert!(logged.contains("there was no fallback Operation for it"));
}

/// Without use_debug nothing is logged at error level
#[tokio::test]
async fn test_no_failure_logs_without_debug() {
    let (logs, _guard) = capture_error_logs();

    let recovered = OpsPipeline::new("Quiet")
        .pipe(failing("primary broke"), "Primary")
        .fallback(append(7), "Repair")
        .start(Payload::empty())
        .await;
    let aborted = OpsPipeline::new("Quiet")
        .pipe(failing("disk full"), "Write")
        .start(Payload::empty())
        .await;

    assert!(recovered.is_success());
    assert!(!aborted.is_success());
    assert_eq!(logs.contents(), "");
}

/// A step can opt out of debug logging inside a debug pipeline
#[tokio::test]
async fn test_step_override_silences_its_failure() {
    let (logs, _guard) = capture_error_logs();

    let outcome = OpsPipeline::with_env(PipelineEnv::new("Mixed").with_debug(true))
        .pipe_with(failing("expected miss"), "Read cache", EnvOverrides::new().debug(false))
        .fallback(append(1), "Fetch")
        .start(Payload::empty())
        .await;

    assert!(outcome.is_success());
    assert_eq!(logs.contents(), "");
}
