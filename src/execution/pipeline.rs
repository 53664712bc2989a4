//! Operation pipelines - ordered queues of steps with per-step fallbacks
//!
//! A pipeline is built with [`OpsPipeline`] and run through the
//! [`LockedPipeline`] that [`OpsPipeline::lock`] turns it into. The building
//! type is consumed by `lock`, so a queue that has been locked (or started)
//! can no longer be changed.

use crate::core::{
    render_pipeline_failure, CapturedError, EnvOverrides, InstanceInfo, Outcome, Payload, PipelineEnv,
    PipelineError, StepEnvironment, Trace, EXIT_FAILURE,
};
use crate::execution::operation::{curry, OpCaller, Operation};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
enum Runnable {
    Operation(OpCaller),
    Pipeline {
        pipeline: Arc<LockedPipeline>,
        description: String,
    },
}

impl Runnable {
    fn description(&self) -> &str {
        match self {
            Runnable::Operation(caller) => &caller.env().description,
            Runnable::Pipeline { description, .. } => description,
        }
    }

    fn environment(&self) -> StepEnvironment {
        match self {
            Runnable::Operation(caller) => StepEnvironment::Operation(caller.env().clone()),
            Runnable::Pipeline { pipeline, .. } => StepEnvironment::Pipeline(pipeline.environment().clone()),
        }
    }

    fn info(&self, is_fallback: bool) -> InstanceInfo {
        match self {
            Runnable::Operation(_) => InstanceInfo::operation(is_fallback),
            Runnable::Pipeline { .. } => InstanceInfo::pipeline(is_fallback),
        }
    }

    fn run(&self, input: Payload, force_trace: bool) -> BoxFuture<'_, Outcome> {
        match self {
            Runnable::Operation(caller) => caller.call(input).boxed(),
            Runnable::Pipeline { pipeline, .. } => pipeline.execute(input, force_trace).boxed(),
        }
    }
}

/// A queue-ready step, produced by [`IntoStep`]
#[derive(Debug, Clone)]
pub struct Step(Runnable);

/// Anything that can be enqueued in a pipeline
///
/// Operations are bound to the pipeline environment merged with the step
/// overrides. Pipelines are locked and run as a single step; they keep their
/// own environment, and an empty step description falls back to theirs.
pub trait IntoStep {
    fn into_step(self, env: &PipelineEnv, description: &str, overrides: &EnvOverrides) -> Step;
}

impl IntoStep for Step {
    fn into_step(self, _env: &PipelineEnv, _description: &str, _overrides: &EnvOverrides) -> Step {
        self
    }
}

impl IntoStep for Operation {
    fn into_step(self, env: &PipelineEnv, description: &str, overrides: &EnvOverrides) -> Step {
        Step(Runnable::Operation(curry(self, env.step_settings(description, overrides))))
    }
}

impl IntoStep for OpsPipeline {
    fn into_step(self, env: &PipelineEnv, description: &str, overrides: &EnvOverrides) -> Step {
        self.lock().into_step(env, description, overrides)
    }
}

impl IntoStep for LockedPipeline {
    fn into_step(self, env: &PipelineEnv, description: &str, overrides: &EnvOverrides) -> Step {
        Arc::new(self).into_step(env, description, overrides)
    }
}

impl IntoStep for Arc<LockedPipeline> {
    fn into_step(self, _env: &PipelineEnv, description: &str, _overrides: &EnvOverrides) -> Step {
        let description = if description.trim().is_empty() {
            self.description().to_string()
        } else {
            description.to_string()
        };
        Step(Runnable::Pipeline {
            pipeline: self,
            description,
        })
    }
}

/// One line of a pipeline outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineItem {
    /// Nesting level, 0 for the steps of the outermost pipeline
    pub depth: usize,
    pub description: String,
    pub is_fallback: bool,
}

#[derive(Debug, Clone)]
struct Entry {
    step: Runnable,
    fallbacks: Vec<Runnable>,
}

/// A pipeline being built
///
/// # Example
///
/// ```
/// use npm_super_pack::{OpsPipeline, Operation, Payload};
/// use serde_json::json;
///
/// # tokio_test_block(async {
/// let outcome = OpsPipeline::new("count")
///     .pipe(Operation::map(|p: Payload| { let mut v = p.to_vec(); v.push(json!(2)); v }), "two")
///     .pipe(Operation::map(|p: Payload| { let mut v = p.to_vec(); v.push(json!(3)); v }), "three")
///     .start(vec![json!(1)])
///     .await;
/// assert_eq!(outcome.payload().as_slice(), &[json!(1), json!(2), json!(3)]);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) { tokio::runtime::Runtime::new().unwrap().block_on(f); }
/// ```
#[derive(Debug)]
pub struct OpsPipeline {
    env: PipelineEnv,
    queue: Vec<Entry>,
    blueprint: Trace,
}

impl OpsPipeline {
    /// Create a pipeline with default settings
    pub fn new(description: impl Into<String>) -> Self {
        Self::with_env(PipelineEnv::new(description))
    }

    /// Create a pipeline with explicit settings
    pub fn with_env(env: PipelineEnv) -> Self {
        let env = env.normalized();
        Self {
            blueprint: Trace::new(env.clone()),
            env,
            queue: Vec::new(),
        }
    }

    /// Append a step to the queue
    pub fn pipe(self, step: impl IntoStep, description: &str) -> Self {
        self.pipe_with(step, description, EnvOverrides::default())
    }

    /// Append a step with its own settings overrides
    pub fn pipe_with(mut self, step: impl IntoStep, description: &str, overrides: EnvOverrides) -> Self {
        let Step(step) = step.into_step(&self.env, description, &overrides);
        debug!(pipeline = %self.env.description, step = %step.description(), "Enqueued step");

        self.blueprint
            .record_enqueue(step.description(), step.environment(), step.info(false));
        self.queue.push(Entry {
            step,
            fallbacks: Vec::new(),
        });
        self
    }

    /// Attach a fallback to the most recently appended step
    ///
    /// Fallbacks of one step are tried in attachment order. Without a
    /// preceding step there is nothing to attach to and the call does nothing.
    pub fn fallback(self, step: impl IntoStep, description: &str) -> Self {
        self.fallback_with(step, description, EnvOverrides::default())
    }

    /// Attach a fallback with its own settings overrides
    pub fn fallback_with(mut self, step: impl IntoStep, description: &str, overrides: EnvOverrides) -> Self {
        let Step(step) = step.into_step(&self.env, description, &overrides);
        if self.queue.is_empty() {
            warn!(
                pipeline = %self.env.description,
                fallback = %step.description(),
                "Ignoring fallback: no step to attach it to"
            );
            return self;
        }

        self.blueprint
            .record_enqueue(step.description(), step.environment(), step.info(true));
        if let Some(entry) = self.queue.last_mut() {
            debug!(
                pipeline = %self.env.description,
                step = %entry.step.description(),
                fallback = %step.description(),
                "Attached fallback"
            );
            entry.fallbacks.push(step);
        }
        self
    }

    /// Freeze the queue
    pub fn lock(self) -> LockedPipeline {
        LockedPipeline {
            env: self.env,
            queue: self.queue,
            blueprint: self.blueprint,
            last_run: Mutex::new(None),
        }
    }

    /// Lock the pipeline and run it once
    pub async fn start(self, input: impl Into<Payload>) -> Outcome {
        self.lock().start(input).await
    }

    pub fn description(&self) -> &str {
        &self.env.description
    }

    pub fn environment(&self) -> &PipelineEnv {
        &self.env
    }

    /// Number of primary steps in the queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// A pipeline whose queue can no longer change
///
/// It can be started any number of times; each run starts from the same
/// queue and records a fresh trace.
#[derive(Debug)]
pub struct LockedPipeline {
    env: PipelineEnv,
    queue: Vec<Entry>,
    blueprint: Trace,
    last_run: Mutex<Option<Trace>>,
}

impl LockedPipeline {
    /// Run the queue with the given input
    pub async fn start(&self, input: impl Into<Payload>) -> Outcome {
        self.execute(input.into(), false).await
    }

    /// Already locked
    pub fn lock(self) -> Self {
        self
    }

    /// Trace of the last run, or of the build when it has not run yet
    ///
    /// `None` when the pipeline was constructed without `use_debug`.
    pub fn traceback(&self) -> Option<Trace> {
        if !self.env.use_debug {
            return None;
        }
        let last_run = self.last_run.lock().unwrap_or_else(PoisonError::into_inner);
        Some(last_run.clone().unwrap_or_else(|| self.blueprint.fresh_run()))
    }

    pub fn description(&self) -> &str {
        &self.env.description
    }

    pub fn environment(&self) -> &PipelineEnv {
        &self.env
    }

    /// Descriptions of every enqueued step and fallback, in enqueue order
    pub fn step_descriptions(&self) -> &[String] {
        &self.blueprint.enqueue_child_descriptions
    }

    /// Every step and fallback, nested pipelines expanded, in queue order
    pub fn outline(&self) -> Vec<OutlineItem> {
        let mut items = Vec::new();
        self.outline_into(0, &mut items);
        items
    }

    fn outline_into(&self, depth: usize, items: &mut Vec<OutlineItem>) {
        for entry in &self.queue {
            outline_runnable(&entry.step, depth, false, items);
            for fallback in &entry.fallbacks {
                outline_runnable(fallback, depth, true, items);
            }
        }
    }

    /// Run the queue; `force_trace` makes a nested pipeline trace for its parent
    async fn execute(&self, input: Payload, force_trace: bool) -> Outcome {
        let collect = self.env.use_debug || force_trace;
        let nesting = self.env.use_nesting_debug || force_trace;
        let mut trace = collect.then(|| self.blueprint.fresh_run());
        let mut carried = input;

        info!(pipeline = %self.env.description, steps = self.queue.len(), "Starting pipeline");

        for entry in &self.queue {
            let mut outcome = entry.step.run(carried.clone(), nesting).await;
            record_run(&mut trace, nesting, &carried, &mut outcome, entry.step.info(false));

            let Some(cause) = outcome.error().cloned() else {
                carried = outcome.into_payload();
                continue;
            };

            if entry.fallbacks.is_empty() {
                let reason = PipelineError::NoFallback {
                    step: entry.step.description().to_string(),
                    cause,
                };
                return self.abort(reason, outcome.error_message(), carried, trace);
            }

            warn!(
                pipeline = %self.env.description,
                step = %entry.step.description(),
                fallbacks = entry.fallbacks.len(),
                "Step failed, trying fallbacks"
            );

            let mut recovered = None;
            let mut last_failure = (cause, outcome.error_message().to_string());
            for fallback in &entry.fallbacks {
                let mut attempt = fallback.run(carried.clone(), nesting).await;
                record_run(&mut trace, nesting, &carried, &mut attempt, fallback.info(true));

                match attempt.error().cloned() {
                    None => {
                        info!(step = %entry.step.description(), fallback = %fallback.description(), "Recovered with fallback");
                        recovered = Some(attempt.into_payload());
                        break;
                    }
                    Some(cause) => last_failure = (cause, attempt.error_message().to_string()),
                }
            }

            match recovered {
                Some(payload) => carried = payload,
                None => {
                    let (cause, inner_message) = last_failure;
                    let reason = PipelineError::FallbacksExhausted {
                        step: entry.step.description().to_string(),
                        attempted: entry.fallbacks.len(),
                        cause,
                    };
                    return self.abort(reason, &inner_message, carried, trace);
                }
            }
        }

        debug!(pipeline = %self.env.description, "Pipeline finished");
        self.finish(Outcome::success(carried), trace)
    }

    fn abort(&self, reason: PipelineError, inner_message: &str, carried: Payload, trace: Option<Trace>) -> Outcome {
        warn!(pipeline = %self.env.description, step = %reason.step(), "Pipeline aborted");

        let failure = CapturedError::new(reason);
        let message = render_pipeline_failure(&failure, &self.env.description, EXIT_FAILURE, inner_message);
        if self.env.use_debug {
            error!("{}", message);
        }
        self.finish(Outcome::failure(carried, EXIT_FAILURE, failure, message), trace)
    }

    fn finish(&self, outcome: Outcome, trace: Option<Trace>) -> Outcome {
        let Some(trace) = trace else {
            return outcome;
        };
        if self.env.use_debug {
            *self.last_run.lock().unwrap_or_else(PoisonError::into_inner) = Some(trace.clone());
        }
        outcome.with_trace(trace)
    }
}

fn outline_runnable(runnable: &Runnable, depth: usize, is_fallback: bool, items: &mut Vec<OutlineItem>) {
    items.push(OutlineItem {
        depth,
        description: runnable.description().to_string(),
        is_fallback,
    });
    if let Runnable::Pipeline { pipeline, .. } = runnable {
        pipeline.outline_into(depth + 1, items);
    }
}

fn record_run(trace: &mut Option<Trace>, nesting: bool, input: &Payload, outcome: &mut Outcome, info: InstanceInfo) {
    let Some(trace) = trace.as_mut() else {
        return;
    };
    let nested = outcome.take_trace();
    trace.record_run(input.clone(), outcome.clone(), info);
    if let (true, Some(nested)) = (nesting, nested) {
        trace.record_nested(nested);
    }
}
