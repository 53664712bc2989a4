//! Test: Traceback - what a debug pipeline records about its runs

use crate::helpers::*;
use npm_super_pack::core::{InstanceInfo, Payload, PipelineEnv, StepEnvironment};
use npm_super_pack::OpsPipeline;
use pretty_assertions::assert_eq;
use serde_json::json;

fn debug_env(description: &str) -> PipelineEnv {
    PipelineEnv::new(description).with_debug(true)
}

/// An empty debug pipeline has every list present and empty
#[tokio::test]
async fn test_empty_debug_pipeline_traceback() {
    let env = debug_env("Empty").with_shell(true);
    let locked = OpsPipeline::with_env(env.clone()).lock();

    let trace = locked.traceback().unwrap();
    assert_eq!(trace.global_environment, env);
    assert_eq!(trace.executed_count(), 0);
    assert!(trace.pipeline_inputs.is_empty());
    assert!(trace.pipeline_outputs.is_empty());
    assert!(trace.enqueue_child_descriptions.is_empty());
    assert!(trace.enqueue_local_environments.is_empty());
    assert!(trace.enqueue_instance_info.is_empty());
    assert!(trace.nested_traces.is_empty());

    let json: serde_json::Value = serde_json::from_str(&trace.to_json().unwrap()).unwrap();
    assert_eq!(json["pipelineOutputs"], json!([]));
    assert_eq!(json["globalEnvironment"]["useDebug"], json!(true));
    assert_eq!(json["globalEnvironment"]["useShell"], json!(true));
}

/// Without debug there is no traceback, before or after a run
#[tokio::test]
async fn test_traceback_unavailable_without_debug() {
    let locked = OpsPipeline::new("Quiet").pipe(append(1), "One").lock();
    assert!(locked.traceback().is_none());

    let outcome = locked.start(Payload::empty()).await;
    assert!(outcome.trace().is_none());
    assert!(locked.traceback().is_none());
}

/// Enqueue records line up with every pipe and fallback call
#[tokio::test]
async fn test_enqueue_records() {
    let locked = OpsPipeline::with_env(debug_env("Build"))
        .pipe(append(1), "One")
        .fallback(append(2), "Two")
        .pipe(OpsPipeline::new("Nested"), "")
        .lock();

    let trace = locked.traceback().unwrap();
    assert_eq!(trace.enqueue_child_descriptions, vec!["One", "Two", "Nested"]);
    assert_eq!(
        trace.enqueue_instance_info,
        vec![
            InstanceInfo::operation(false),
            InstanceInfo::operation(true),
            InstanceInfo::pipeline(false),
        ]
    );
    match &trace.enqueue_local_environments[0] {
        StepEnvironment::Operation(settings) => assert!(settings.use_debug),
        other => panic!("expected operation settings, got {:?}", other),
    }
    assert!(matches!(
        &trace.enqueue_local_environments[2],
        StepEnvironment::Pipeline(env) if env.description == "Nested"
    ));
}

/// Every executed entry is recorded, fallbacks included, and each run starts over
#[tokio::test]
async fn test_run_records_reset_per_start() {
    let locked = OpsPipeline::with_env(debug_env("Runs"))
        .pipe(append(1), "One")
        .pipe(failing("broken"), "Broken")
        .fallback(append(2), "Repair")
        .lock();

    for _ in 0..2 {
        let outcome = locked.start(vec![json!(0)]).await;
        assert!(outcome.is_success());

        let trace = outcome.trace().unwrap();
        assert_eq!(trace.executed_count(), 3);
        assert_eq!(
            trace.pipeline_instance_info,
            vec![
                InstanceInfo::operation(false),
                InstanceInfo::operation(false),
                InstanceInfo::operation(true),
            ]
        );
        assert_eq!(trace.pipeline_inputs[2].as_slice(), &[json!(0), json!(1)]);
        assert!(!trace.pipeline_outputs[1].is_success());
        assert_eq!(trace.pipeline_outputs[2].payload().as_slice(), &[json!(0), json!(1), json!(2)]);
    }

    assert_eq!(locked.traceback().unwrap().executed_count(), 3);
}

/// Nested traces are kept only with nesting debug
#[tokio::test]
async fn test_nested_traces_need_nesting_debug() {
    let build = |env: PipelineEnv| {
        OpsPipeline::with_env(env)
            .pipe(OpsPipeline::new("Inner").pipe(append(1), "One"), "")
            .lock()
    };

    let shallow = build(debug_env("Shallow")).start(Payload::empty()).await;
    assert!(shallow.trace().unwrap().nested_traces.is_empty());

    let deep = build(PipelineEnv::new("Deep").with_nesting_debug(true))
        .start(Payload::empty())
        .await;
    let trace = deep.trace().unwrap();
    assert!(trace.global_environment.use_debug);
    assert_eq!(trace.nested_traces.len(), 1);

    let nested = &trace.nested_traces[0];
    assert_eq!(nested.global_environment.description, "Inner");
    assert_eq!(nested.enqueue_child_descriptions, vec!["One"]);
    assert_eq!(nested.executed_count(), 1);
    assert!(trace.pipeline_outputs[0].trace().is_none());
}
