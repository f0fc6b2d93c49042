//! Worker Side
//!
//! A worker is this binary started with the worker flag. It announces
//! itself with `Hello`, then evaluates `Run` commands one at a time until
//! told to stop, its input closes, or it receives SIGTERM.
//!
//! The pipe pair comes from `FLUXCASE_IPC_FD` (`<read>,<write>`); without it
//! the worker talks over stdin/stdout, which is handy for poking at it by
//! hand.

use fluxcase_core::{CallLimits, MethodDef, RawOutcome, registered_methods};
use fluxcase_ipc::{
    CaseRequest, FrameError, FrameReader, FrameWriter, IPC_FD_ENV, OutcomeReport,
    SupervisorCommand, WorkerCapabilities, WorkerMessage,
};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

static TERMINATING: AtomicBool = AtomicBool::new(false);

/// Whether SIGTERM has been received.
pub fn shutdown_requested() -> bool {
    TERMINATING.load(Ordering::Relaxed)
}

#[cfg(unix)]
extern "C" fn on_sigterm(_signal: libc::c_int) {
    TERMINATING.store(true, Ordering::Relaxed);
}

#[cfg(unix)]
fn trap_sigterm() {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_sigterm as *const () as usize;
        action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGTERM, &action, std::ptr::null_mut());
    }
}

#[cfg(not(unix))]
fn trap_sigterm() {}

/// Parse `<read_fd>,<write_fd>`.
fn parse_fd_pair(value: &str) -> Option<(i32, i32)> {
    let (read, write) = value.split_once(',')?;
    Some((read.trim().parse().ok()?, write.trim().parse().ok()?))
}

type Input = Box<dyn Read>;
type Output = Box<dyn Write>;

#[cfg(unix)]
fn inherited_pipes() -> Option<(Input, Output)> {
    use std::os::fd::FromRawFd;

    let value = std::env::var(IPC_FD_ENV).ok()?;
    let Some((read, write)) = parse_fd_pair(&value) else {
        tracing::warn!(
            "ignoring {}={:?}, expected <read_fd>,<write_fd>",
            IPC_FD_ENV,
            value
        );
        return None;
    };
    // The supervisor hands these descriptors to this process alone
    let (input, output) = unsafe {
        (
            std::fs::File::from_raw_fd(read),
            std::fs::File::from_raw_fd(write),
        )
    };
    Some((Box::new(input), Box::new(output)))
}

#[cfg(not(unix))]
fn inherited_pipes() -> Option<(Input, Output)> {
    None
}

/// Worker event loop
pub struct WorkerMain {
    commands: FrameReader<Input>,
    replies: FrameWriter<Output>,
    methods: Vec<&'static MethodDef>,
}

impl WorkerMain {
    /// Worker over the inherited pipes, or stdio without them.
    pub fn new() -> Self {
        let (input, output) = inherited_pipes().unwrap_or_else(|| {
            (
                Box::new(std::io::stdin()) as Input,
                Box::new(std::io::stdout()) as Output,
            )
        });
        Self {
            commands: FrameReader::new(input),
            replies: FrameWriter::new(output),
            methods: registered_methods(),
        }
    }

    /// Serve commands until shutdown.
    pub fn run(&mut self) -> Result<(), FrameError> {
        trap_sigterm();
        fluxcase_core::install_quiet_panic_hook();

        self.replies
            .send(&WorkerMessage::Hello(WorkerCapabilities::current(
                self.methods.len(),
            )))?;

        while !shutdown_requested() {
            let command = match self.commands.recv::<SupervisorCommand>() {
                Ok(command) => command,
                // Supervisor went away
                Err(FrameError::EndOfStream) => break,
                Err(e) => return Err(e),
            };

            match command {
                SupervisorCommand::Run(request) => {
                    let started = Instant::now();
                    let outcome = self.evaluate(&request);
                    self.replies.send(&WorkerMessage::CaseCompleted {
                        outcome,
                        duration_nanos: u64::try_from(started.elapsed().as_nanos())
                            .unwrap_or(u64::MAX),
                    })?;
                }
                SupervisorCommand::Shutdown => break,
            }
        }
        Ok(())
    }

    fn evaluate(&self, request: &CaseRequest) -> OutcomeReport {
        if let Err(message) = request.validate() {
            return OutcomeReport::ArgsRejected { message };
        }

        let def = match resolve(&self.methods, &request.method_id) {
            Ok(def) => def,
            Err(outcome) => return outcome,
        };

        let args = match fluxcase_logic::parse_args(&request.args) {
            Ok(args) => args,
            Err(e) => {
                return OutcomeReport::ArgsRejected {
                    message: e.to_string(),
                };
            }
        };

        tracing::trace!(method = def.id, case = request.case_index, "Evaluating");
        let limits = CallLimits {
            max_depth: request.max_depth,
            max_steps: request.max_steps,
        };
        outcome_report(fluxcase_core::call(def, &args, limits, None))
    }
}

impl Default for WorkerMain {
    fn default() -> Self {
        Self::new()
    }
}

/// The one method registered under `id`.
fn resolve(
    methods: &[&'static MethodDef],
    id: &str,
) -> Result<&'static MethodDef, OutcomeReport> {
    let mut matching = methods.iter().copied().filter(|m| m.id == id);
    match (matching.next(), matching.next()) {
        (Some(def), None) => Ok(def),
        (None, _) => Err(OutcomeReport::UnknownMethod {
            method_id: id.to_string(),
        }),
        (Some(_), Some(_)) => Err(OutcomeReport::DuplicateMethod {
            method_id: id.to_string(),
        }),
    }
}

/// Wire form of a call result.
pub fn outcome_report(raw: RawOutcome) -> OutcomeReport {
    match raw {
        RawOutcome::Returned(value) => OutcomeReport::Returned { value },
        RawOutcome::Faulted(fault) => OutcomeReport::Faulted {
            phrase: fault.category().phrase().to_string(),
        },
        RawOutcome::Interrupted(_) => OutcomeReport::Interrupted,
        RawOutcome::Unmapped(message) => OutcomeReport::Unmapped { message },
        RawOutcome::Bind(err) => OutcomeReport::BindFailed {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxcase_core::{BindError, Fault};

    #[test]
    fn test_outcome_report_mapping() {
        assert_eq!(
            outcome_report(RawOutcome::Returned(Some("5".to_string()))),
            OutcomeReport::Returned {
                value: Some("5".to_string())
            }
        );
        assert_eq!(
            outcome_report(RawOutcome::Faulted(Fault::DivideByZero)),
            OutcomeReport::Faulted {
                phrase: "divide by zero".to_string()
            }
        );
        assert!(matches!(
            outcome_report(RawOutcome::Bind(BindError::Arity {
                expected: 0,
                got: 1
            })),
            OutcomeReport::BindFailed { .. }
        ));
    }

    fn no_params() -> Vec<fluxcase_core::ParamType> {
        Vec::new()
    }

    fn noop(_args: &[fluxcase_core::ArgValue]) -> Result<Option<String>, BindError> {
        Ok(None)
    }

    fn def_named(name: &'static str) -> &'static MethodDef {
        Box::leak(Box::new(MethodDef {
            id: "worker_tests::shared",
            name,
            class: None,
            tags: &[],
            cases: &[],
            params_fn: no_params,
            invoke_fn: noop,
            file: "worker_tests.rs",
            line: 1,
            module_path: "worker_tests",
        }))
    }

    #[test]
    fn test_resolve_requires_unique_id() {
        let first = def_named("first");
        let second = def_named("second");

        assert_eq!(resolve(&[first], "worker_tests::shared").map(|d| d.name), Ok("first"));
        assert_eq!(
            resolve(&[first, second], "worker_tests::shared").map(|d| d.name),
            Err(OutcomeReport::DuplicateMethod {
                method_id: "worker_tests::shared".to_string()
            })
        );
        assert!(matches!(
            resolve(&[first], "worker_tests::other"),
            Err(OutcomeReport::UnknownMethod { .. })
        ));
    }

    #[test]
    fn test_parse_fd_pair() {
        assert_eq!(parse_fd_pair("3,4"), Some((3, 4)));
        assert_eq!(parse_fd_pair(" 3 , 4"), Some((3, 4)));
        assert_eq!(parse_fd_pair("3"), None);
        assert_eq!(parse_fd_pair("a,4"), None);
    }
}
