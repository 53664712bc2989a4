//! Operation wrapper - runs one callable and turns whatever happens into an Outcome

use crate::core::{
    render_operation_failure, CapturedError, EnvSettings, IntoPayload, Outcome, Payload, EXIT_FAILURE,
};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

type OpFn = dyn Fn(Payload) -> BoxFuture<'static, Result<Payload, CapturedError>> + Send + Sync;

/// A unit of work that takes the carried payload and returns a new one
///
/// The callable may be synchronous or asynchronous. It signals failure by
/// returning `Err`; a panic is caught as well and reported as a
/// [`NonErrorThrown`](crate::core::NonErrorThrown) failure.
///
/// Catching happens after the process panic hook has run, so with the default
/// hook a panicking operation still prints `thread '..' panicked at ..` to
/// stderr, even when a fallback recovers from it. Callers that want recovered
/// panics to stay quiet install their own hook with [`std::panic::set_hook`].
#[derive(Clone)]
pub struct Operation {
    func: Arc<OpFn>,
}

impl Operation {
    /// Wrap a synchronous callable
    pub fn new<F, R, E>(func: F) -> Self
    where
        F: Fn(Payload) -> Result<R, E> + Send + Sync + 'static,
        R: IntoPayload + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        Self::from_boxed(move |input| {
            let result = func(input)
                .map(IntoPayload::into_payload)
                .map_err(CapturedError::new);
            future::ready(result).boxed()
        })
    }

    /// Wrap an asynchronous callable
    pub fn new_async<F, Fut, R, E>(func: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: IntoPayload + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        Self::from_boxed(move |input| {
            let pending = func(input);
            async move {
                pending
                    .await
                    .map(IntoPayload::into_payload)
                    .map_err(CapturedError::new)
            }
            .boxed()
        })
    }

    /// Wrap a callable that cannot fail
    pub fn map<F, R>(func: F) -> Self
    where
        F: Fn(Payload) -> R + Send + Sync + 'static,
        R: IntoPayload + 'static,
    {
        Self::new(move |input| Ok::<R, std::convert::Infallible>(func(input)))
    }

    /// An operation that hands its input back untouched
    pub fn identity() -> Self {
        Self::from_boxed(|input| future::ready(Ok(input)).boxed())
    }

    fn from_boxed<F>(func: F) -> Self
    where
        F: Fn(Payload) -> BoxFuture<'static, Result<Payload, CapturedError>> + Send + Sync + 'static,
    {
        Self { func: Arc::new(func) }
    }

    /// Invoke the callable, catching panics both while it is called and while it is polled
    async fn invoke(&self, input: Payload) -> Result<Payload, CapturedError> {
        let pending = match panic::catch_unwind(AssertUnwindSafe(|| (self.func)(input))) {
            Ok(pending) => pending,
            Err(panic) => return Err(CapturedError::from_panic(panic)),
        };
        AssertUnwindSafe(pending)
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(CapturedError::from_panic(panic)))
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").finish_non_exhaustive()
    }
}

/// Run an operation with the given input and settings
///
/// Never fails and never panics out: every path produces an [`Outcome`].
/// With `use_shell`, an [`ExitCodeError`](crate::core::ExitCodeError) in the
/// error chain supplies the exit code. With `use_loopback`, a successful run
/// forwards the input payload itself and the return value is discarded.
pub async fn run_operation(operation: &Operation, input: Payload, env: &EnvSettings) -> Outcome {
    debug!(step = %env.description, inputs = input.len(), "Running operation");

    let carried = env.use_loopback.then(|| input.clone());

    match operation.invoke(input).await {
        Ok(payload) => {
            debug!(step = %env.description, "Operation succeeded");
            Outcome::success(carried.unwrap_or(payload))
        }
        Err(failure) => {
            let exit_code = if env.use_shell {
                failure
                    .exit_code()
                    .filter(|code| *code != 0)
                    .unwrap_or(EXIT_FAILURE)
            } else {
                EXIT_FAILURE
            };
            let message = render_operation_failure(&failure, &env.description, exit_code);
            if env.use_debug {
                error!("{}", message);
            }
            Outcome::failure(Payload::empty(), exit_code, failure, message)
        }
    }
}

/// An operation bound to its settings, waiting for an input
#[derive(Debug, Clone)]
pub struct OpCaller {
    operation: Operation,
    env: EnvSettings,
}

impl OpCaller {
    pub async fn call(&self, input: Payload) -> Outcome {
        run_operation(&self.operation, input, &self.env).await
    }

    pub fn env(&self) -> &EnvSettings {
        &self.env
    }
}

/// Bind an operation to its settings
pub fn curry(operation: Operation, env: EnvSettings) -> OpCaller {
    OpCaller { operation, env }
}
