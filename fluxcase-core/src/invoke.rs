//! Guarded Invocation
//!
//! Calls a registered method on bound arguments behind `catch_unwind`, then
//! resolves the raw result into an [`Actual`] outcome or a [`HarnessError`].

use crate::MethodDef;
use crate::bind::BindError;
use crate::guard::{self, CallLimits};
use crate::outcome::{Actual, Classified, Fault, Interrupted, OutcomeCategory, classify_panic};
use crate::value::ArgValue;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failures of the harness itself, as opposed to outcomes of the method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// Arguments did not fit the signature
    #[error(transparent)]
    Bind(#[from] BindError),

    /// Binding failure reported by a worker process, as text
    #[error("{0}")]
    WorkerBind(String),

    /// A panic outside the taxonomy escaped the method
    #[error("unmapped fault: {message}")]
    UnmappedFault {
        /// Panic message
        message: String,
    },

    /// The worker process died or stopped responding mid-case
    #[error("worker crashed: {message}")]
    WorkerCrashed {
        /// What was observed about the worker
        message: String,
    },

    /// Malformed exchange with a worker
    #[error("ipc error: {0}")]
    Ipc(String),

    /// No registered method has this id
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// More than one registered method carries this id
    #[error("method id {0:?} is registered more than once")]
    DuplicateMethodId(String),

    /// The harness could not run the call at all
    #[error("invocation failed: {0}")]
    Internal(String),
}

/// Result of a call as seen at the method boundary, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutcome {
    /// Returned normally, with the `Debug` text of a non-unit return value
    Returned(Option<String>),
    /// A typed fault escaped the method
    Faulted(Fault),
    /// Stopped at a checkpoint
    Interrupted(Interrupted),
    /// A panic without a taxonomy payload
    Unmapped(String),
    /// Arguments did not fit the signature; the body never ran
    Bind(BindError),
}

impl RawOutcome {
    /// Resolve into an actual outcome. Interruptions count as a timeout.
    pub fn resolve(self) -> Result<Actual, HarnessError> {
        match self {
            RawOutcome::Returned(_) => Ok(Actual::Completed(OutcomeCategory::Ok)),
            RawOutcome::Faulted(fault) => Ok(Actual::Completed(fault.category())),
            RawOutcome::Interrupted(_) => Ok(Actual::Timeout),
            RawOutcome::Unmapped(message) => Err(HarnessError::UnmappedFault { message }),
            RawOutcome::Bind(err) => Err(HarnessError::Bind(err)),
        }
    }

    /// Rendered return value of a normal return.
    pub fn return_value(&self) -> Option<&str> {
        match self {
            RawOutcome::Returned(value) => value.as_deref(),
            _ => None,
        }
    }
}

/// One evaluated invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// Outcome, or why there is none
    pub result: Result<Actual, HarnessError>,
    /// `Debug` text of the return value, if any
    pub return_value: Option<String>,
    /// Wall-clock time of the call
    pub duration: Duration,
}

impl Execution {
    /// Resolve a raw call result.
    pub fn from_raw(raw: RawOutcome, duration: Duration) -> Self {
        let return_value = raw.return_value().map(str::to_string);
        Self {
            result: raw.resolve(),
            return_value,
            duration,
        }
    }

    /// An execution stopped by its budget.
    pub fn timeout(duration: Duration) -> Self {
        Self {
            result: Ok(Actual::Timeout),
            return_value: None,
            duration,
        }
    }

    /// An execution that produced no outcome.
    pub fn harness_error(err: HarnessError, duration: Duration) -> Self {
        Self {
            result: Err(err),
            return_value: None,
            duration,
        }
    }
}

/// Invoke `def` on the current thread.
pub fn call(
    def: &MethodDef,
    args: &[ArgValue],
    limits: CallLimits,
    cancel: Option<Arc<AtomicBool>>,
) -> RawOutcome {
    let _scope = guard::install(limits, cancel);
    let result = panic::catch_unwind(AssertUnwindSafe(|| (def.invoke_fn)(args)));

    match result {
        Ok(Ok(value)) => RawOutcome::Returned(value),
        Ok(Err(bind)) => RawOutcome::Bind(bind),
        Err(payload) => match classify_panic(payload.as_ref()) {
            Classified::Fault(fault) => RawOutcome::Faulted(fault),
            Classified::Interrupted(reason) => RawOutcome::Interrupted(reason),
            Classified::Unmapped(message) => RawOutcome::Unmapped(message),
        },
    }
}

/// Invoke and time `def` with no wall-clock budget.
pub fn execute(def: &MethodDef, args: &[ArgValue], limits: CallLimits) -> Execution {
    let start = Instant::now();
    let raw = call(def, args, limits, None);
    Execution::from_raw(raw, start.elapsed())
}

/// Invoke `def` on a dedicated thread and wait at most `budget`.
///
/// On expiry the cancellation flag is set and the thread is detached; the
/// call unwinds at its next [`checkpoint`](crate::checkpoint) or runs to
/// completion unobserved. The caller never waits past `budget`.
pub fn execute_with_budget(
    def: &'static MethodDef,
    args: Vec<ArgValue>,
    limits: CallLimits,
    budget: Duration,
    stack_size: Option<usize>,
) -> Execution {
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let start = Instant::now();

    let mut builder = std::thread::Builder::new().name(format!("fluxcase-{}", def.name));
    if let Some(size) = stack_size {
        builder = builder.stack_size(size);
    }

    let flag = cancel.clone();
    let spawned = builder.spawn(move || {
        let raw = call(def, &args, limits, Some(flag));
        let _ = tx.send(raw);
    });

    if let Err(e) = spawned {
        return Execution::harness_error(
            HarnessError::Internal(format!("failed to spawn call thread: {}", e)),
            start.elapsed(),
        );
    }

    match rx.recv_timeout(budget) {
        Ok(raw) => Execution::from_raw(raw, start.elapsed()),
        Err(RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Relaxed);
            tracing::debug!(
                method = def.id,
                budget_ms = budget.as_millis() as u64,
                "Call exceeded budget, abandoning thread"
            );
            Execution::timeout(start.elapsed())
        }
        Err(RecvTimeoutError::Disconnected) => Execution::harness_error(
            HarnessError::Internal("call thread exited without a result".to_string()),
            start.elapsed(),
        ),
    }
}

/// Replace the panic hook with one that stays silent for typed faults.
///
/// Unmapped panics still reach the previous hook. Installing twice is a no-op.
pub fn install_quiet_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let payload = info.payload();
            if payload.is::<Fault>() || payload.is::<Interrupted>() {
                return;
            }
            previous(info);
        }));
    });
}
