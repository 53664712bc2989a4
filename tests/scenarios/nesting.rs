//! Test: Nesting - pipelines used as steps of other pipelines

use crate::helpers::*;
use npm_super_pack::core::{EnvOverrides, Payload, PipelineEnv, PipelineError};
use npm_super_pack::OpsPipeline;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::Ordering;

/// Nesting steps gives the same outcome as listing them directly
#[tokio::test]
async fn test_nesting_is_transparent() {
    let flat = OpsPipeline::new("Flat")
        .pipe(append(1), "One")
        .pipe(append(2), "Two")
        .pipe(append(3), "Three")
        .pipe(append(4), "Four")
        .start(vec![json!(0)])
        .await;

    let inner = OpsPipeline::new("Inner").pipe(append(2), "Two").pipe(append(3), "Three");
    let nested = OpsPipeline::new("Outer")
        .pipe(append(1), "One")
        .pipe(inner, "")
        .pipe(append(4), "Four")
        .start(vec![json!(0)])
        .await;

    assert!(flat.is_success());
    assert!(nested.is_success());
    assert_eq!(flat.payload(), nested.payload());
    assert_eq!(flat.exit_code(), nested.exit_code());
}

/// A nested pipeline is described by its own name unless the step names it
#[tokio::test]
async fn test_nested_description() {
    let outer = OpsPipeline::new("Outer")
        .pipe(OpsPipeline::new("Back up left-pad"), "")
        .pipe(OpsPipeline::new("Back up chalk"), "Chalk")
        .lock();

    assert_eq!(
        outer.step_descriptions(),
        &["Back up left-pad".to_string(), "Chalk".to_string()]
    );
}

/// Each enclosing pipeline adds a header and indents the message below it
#[tokio::test]
async fn test_nested_failure_message_chain() {
    let inner = OpsPipeline::new("Inner").pipe(failing("socket hang up"), "Fetch");
    let outcome = OpsPipeline::new("Outer")
        .pipe(append(1), "One")
        .pipe(inner, "")
        .start(Payload::empty())
        .await;

    assert!(!outcome.is_success());
    let lines: Vec<&str> = outcome.error_message().lines().collect();
    assert_eq!(lines.len(), 12);
    assert_eq!(lines[0], "ERROR! Error type: PipelineError");
    assert_eq!(lines[1], "Name of the Operation Pipeline that failed: \"Outer\"");
    assert_eq!(lines[2], "Error exit code: 1");
    assert_eq!(lines[4], "    ERROR! Error type: PipelineError");
    assert_eq!(lines[5], "    Name of the Operation Pipeline that failed: \"Inner\"");
    assert_eq!(lines[8], "        ERROR! Error type: Error");
    assert_eq!(lines[9], "        Name of the Operation that failed: \"Fetch\"");
    assert_eq!(lines[11], "        Error output: Error: socket hang up");

    // The outer pipeline reports the nested one as the step that failed
    let reason = outcome.error().unwrap().downcast_ref::<PipelineError>().unwrap();
    assert_eq!(reason.step(), "Inner");
    assert_eq!(outcome.payload().as_slice(), &[json!(1)]);
}

/// A failed nested pipeline can be replaced by a fallback of the outer one
#[tokio::test]
async fn test_fallback_for_nested_pipeline() {
    let log = CallLog::new();
    let inner = OpsPipeline::new("Inner")
        .pipe(append(2), "Two")
        .pipe(log.failing("broken", "nope"), "Broken");

    let outcome = OpsPipeline::new("Outer")
        .pipe(append(1), "One")
        .pipe(inner, "")
        .fallback(log.succeeding("fallback", json!("replacement")), "Replacement")
        .start(Payload::empty())
        .await;

    assert!(outcome.is_success());
    assert_eq!(log.input_of("broken").unwrap().as_slice(), &[json!(1), json!(2)]);
    assert_eq!(log.input_of("fallback").unwrap().as_slice(), &[json!(1)]);
    assert_eq!(outcome.payload().as_slice(), &[json!("replacement")]);
}

/// Nested pipelines keep their own settings, and can be nested more than once
#[tokio::test]
async fn test_nested_pipeline_keeps_own_environment() {
    let (count, calls) = counter();
    let inner = OpsPipeline::with_env(PipelineEnv::new("Inner").with_shell(true)).pipe(count, "Count");
    let middle = OpsPipeline::new("Middle").pipe(inner, "");
    let outer = OpsPipeline::new("Outer")
        .pipe_with(middle, "", EnvOverrides::new().loopback(true))
        .lock();

    let input = Payload::single(json!("kept"));
    let outcome = outer.start(input.clone()).await;

    assert!(outcome.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.payload(), &input);
}
