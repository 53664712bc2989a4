//! Trace - build-time and run-time history of a pipeline

use crate::core::env::{EnvSettings, PipelineEnv};
use crate::core::outcome::Outcome;
use crate::core::payload::Payload;
use serde::Serialize;

/// What kind of queue entry a trace record refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInfo {
    pub is_operation: bool,
    pub is_pipeline: bool,
    pub is_fallback: bool,
}

impl InstanceInfo {
    pub fn operation(is_fallback: bool) -> Self {
        Self {
            is_operation: true,
            is_pipeline: false,
            is_fallback,
        }
    }

    pub fn pipeline(is_fallback: bool) -> Self {
        Self {
            is_operation: false,
            is_pipeline: true,
            is_fallback,
        }
    }
}

/// Environment a queue entry was enqueued with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepEnvironment {
    Operation(EnvSettings),
    Pipeline(PipelineEnv),
}

impl StepEnvironment {
    pub fn description(&self) -> &str {
        match self {
            StepEnvironment::Operation(env) => &env.description,
            StepEnvironment::Pipeline(env) => &env.description,
        }
    }
}

/// Parallel lists recorded by a pipeline
///
/// The `enqueue_*` lists grow with every `pipe`/`fallback` call and line up
/// index by index. The `pipeline_*` lists grow with every executed entry
/// (primary or fallback) of the most recent run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub pipeline_inputs: Vec<Payload>,
    /// Outcomes of executed entries, stored without their own traces
    pub pipeline_outputs: Vec<Outcome>,
    pub pipeline_instance_info: Vec<InstanceInfo>,
    pub enqueue_child_descriptions: Vec<String>,
    pub enqueue_local_environments: Vec<StepEnvironment>,
    pub enqueue_instance_info: Vec<InstanceInfo>,
    pub global_environment: PipelineEnv,
    /// Traces of nested pipelines, only filled with nesting debug on
    pub nested_traces: Vec<Trace>,
}

impl Trace {
    pub fn new(global_environment: PipelineEnv) -> Self {
        Self {
            pipeline_inputs: Vec::new(),
            pipeline_outputs: Vec::new(),
            pipeline_instance_info: Vec::new(),
            enqueue_child_descriptions: Vec::new(),
            enqueue_local_environments: Vec::new(),
            enqueue_instance_info: Vec::new(),
            global_environment,
            nested_traces: Vec::new(),
        }
    }

    pub(crate) fn record_enqueue(&mut self, description: &str, environment: StepEnvironment, info: InstanceInfo) {
        self.enqueue_child_descriptions.push(description.to_string());
        self.enqueue_local_environments.push(environment);
        self.enqueue_instance_info.push(info);
    }

    pub(crate) fn record_run(&mut self, input: Payload, output: Outcome, info: InstanceInfo) {
        self.pipeline_inputs.push(input);
        self.pipeline_outputs.push(output.without_trace());
        self.pipeline_instance_info.push(info);
    }

    pub(crate) fn record_nested(&mut self, trace: Trace) {
        self.nested_traces.push(trace);
    }

    /// Copy of the build-time record with empty run lists
    pub(crate) fn fresh_run(&self) -> Trace {
        Trace {
            pipeline_inputs: Vec::new(),
            pipeline_outputs: Vec::new(),
            pipeline_instance_info: Vec::new(),
            enqueue_child_descriptions: self.enqueue_child_descriptions.clone(),
            enqueue_local_environments: self.enqueue_local_environments.clone(),
            enqueue_instance_info: self.enqueue_instance_info.clone(),
            global_environment: self.global_environment.clone(),
            nested_traces: Vec::new(),
        }
    }

    /// Number of entries that ran in the recorded run
    pub fn executed_count(&self) -> usize {
        self.pipeline_instance_info.len()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
