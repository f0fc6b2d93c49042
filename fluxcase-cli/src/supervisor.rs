//! Isolated Execution
//!
//! Each shard of cases is driven through one long-lived worker process
//! (this binary re-executed with the worker flag). Commands flow over a
//! pipe mapped to the worker's fd 3, replies come back on fd 4. A worker
//! that overruns its case budget is killed and the next case of the shard
//! gets a fresh one.

use fluxcase_core::{CallLimits, Execution, Fault, HarnessError, OutcomeCategory, RawOutcome};
use fluxcase_ipc::{
    CaseRequest, FrameError, FrameReader, FrameWriter, IPC_FD_ENV, OutcomeReport,
    PROTOCOL_VERSION, SupervisorCommand, WORKER_FLAG, WorkerMessage,
};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest single wait before the worker's liveness is re-checked
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Grace period between SIGTERM and SIGKILL
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Failures of the supervisor or one of its workers
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The worker process could not be started
    #[error("cannot start worker: {0}")]
    Spawn(#[from] io::Error),

    /// Frame exchange with a worker failed
    #[error("pipe error: {0}")]
    Frame(#[from] FrameError),

    /// The worker exited or closed its pipe
    #[error("worker died: {0}")]
    Died(String),

    /// No `Hello` within the allowed time
    #[error("no handshake from worker within {0:?}")]
    Handshake(Duration),

    /// The worker sent something out of turn
    #[error("unexpected worker message: {0}")]
    Protocol(String),

    /// The case outlived its budget; the worker was killed
    #[error("case budget exhausted after {0:?}")]
    OverBudget(Duration),

    /// Sharding across workers failed
    #[error("worker pool: {0}")]
    Pool(String),
}

/// One case bound for a worker
#[derive(Debug, Clone)]
pub struct CaseJob {
    /// Qualified method id
    pub method_id: &'static str,
    /// Declaration index within the method
    pub case_index: usize,
    /// Canonical argument text
    pub args: String,
    /// Wall-clock budget; `None` waits for as long as the worker lives
    pub budget: Option<Duration>,
}

enum Readiness {
    Readable,
    Quiet,
    HungUp,
}

/// `poll(2)` a single descriptor for input.
fn readiness(fd: RawFd, wait: Duration) -> io::Result<Readiness> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let millis = i32::try_from(wait.as_millis()).unwrap_or(i32::MAX);

    match unsafe { libc::poll(&mut pfd, 1, millis) } {
        n if n < 0 => Err(io::Error::last_os_error()),
        0 => Ok(Readiness::Quiet),
        // Pending input wins over a simultaneous hangup
        _ if pfd.revents & libc::POLLIN != 0 => Ok(Readiness::Readable),
        _ if pfd.revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0 => {
            Ok(Readiness::HungUp)
        }
        _ => Ok(Readiness::Quiet),
    }
}

/// A close-on-exec pipe as `(read end, write end)`.
fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [-1 as RawFd; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    for fd in [read.as_raw_fd(), write.as_raw_fd()] {
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFD);
            libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC);
        }
    }
    Ok((read, write))
}

/// Make `src` available as `target` in a freshly forked child.
///
/// Only async-signal-safe calls are allowed here.
unsafe fn install_fd(src: RawFd, target: RawFd) -> io::Result<()> {
    unsafe {
        if src == target {
            let flags = libc::fcntl(target, libc::F_GETFD);
            if libc::fcntl(target, libc::F_SETFD, flags & !libc::FD_CLOEXEC) == -1 {
                return Err(io::Error::last_os_error());
            }
        } else if libc::dup2(src, target) == -1 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// A running worker process
pub struct Worker {
    child: Child,
    commands: FrameWriter<File>,
    replies: FrameReader<File>,
    reply_fd: RawFd,
}

impl Worker {
    /// Start a worker from the current executable.
    pub fn spawn(handshake: Duration) -> Result<Self, SupervisorError> {
        let binary = std::env::current_exe()?;
        Self::spawn_binary(&binary, handshake)
    }

    /// Start a worker from `binary` and wait for its `Hello`.
    pub fn spawn_binary(binary: &Path, handshake: Duration) -> Result<Self, SupervisorError> {
        let (cmd_rx, cmd_tx) = pipe()?;
        let (reply_rx, reply_tx) = pipe()?;

        let child_in = cmd_rx.as_raw_fd();
        let child_out = reply_tx.as_raw_fd();

        let mut command = Command::new(binary);
        command
            .arg(WORKER_FLAG)
            .env(IPC_FD_ENV, "3,4")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        unsafe {
            command.pre_exec(move || {
                // fd 3 must not clobber the reply end before it is moved
                let out = if child_out == 3 {
                    libc::dup(child_out)
                } else {
                    child_out
                };
                install_fd(child_in, 3)?;
                install_fd(out, 4)
            });
        }

        // Child ends drop (and close) here once the process has them
        let child = command.spawn()?;
        drop(cmd_rx);
        drop(reply_tx);

        let reply_fd = reply_rx.as_raw_fd();
        let mut worker = Self {
            child,
            commands: FrameWriter::new(File::from(cmd_tx)),
            replies: FrameReader::new(File::from(reply_rx)),
            reply_fd,
        };
        worker.handshake(handshake)?;
        Ok(worker)
    }

    /// Process id of the worker.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    fn handshake(&mut self, wait: Duration) -> Result<(), SupervisorError> {
        match readiness(self.reply_fd, wait)? {
            Readiness::Readable => {}
            Readiness::Quiet => return Err(SupervisorError::Handshake(wait)),
            Readiness::HungUp => {
                return Err(SupervisorError::Died("exited before handshake".to_string()));
            }
        }

        match self.replies.recv::<WorkerMessage>()? {
            WorkerMessage::Hello(caps) if caps.protocol_version == PROTOCOL_VERSION => {
                tracing::debug!(pid = caps.pid, methods = caps.method_count, "Worker ready");
                Ok(())
            }
            WorkerMessage::Hello(caps) => Err(SupervisorError::Protocol(format!(
                "worker speaks protocol {}, supervisor speaks {}",
                caps.protocol_version, PROTOCOL_VERSION
            ))),
            other => Err(SupervisorError::Protocol(format!(
                "expected Hello, got {:?}",
                other
            ))),
        }
    }

    /// Run one case and wait for its outcome within the job's budget.
    pub fn evaluate(
        &mut self,
        job: &CaseJob,
        limits: CallLimits,
    ) -> Result<Execution, SupervisorError> {
        self.commands.send(&SupervisorCommand::Run(CaseRequest {
            method_id: job.method_id.to_string(),
            case_index: u32::try_from(job.case_index).unwrap_or(u32::MAX),
            args: job.args.clone(),
            max_depth: limits.max_depth,
            max_steps: limits.max_steps,
        }))?;

        let started = Instant::now();
        let deadline = job.budget.map(|budget| started + budget);

        match self.next_reply(deadline)? {
            Some(WorkerMessage::CaseCompleted {
                outcome,
                duration_nanos,
            }) => Ok(report_to_execution(
                outcome,
                Duration::from_nanos(duration_nanos),
            )),
            Some(other) => Err(SupervisorError::Protocol(format!(
                "expected CaseCompleted, got {:?}",
                other
            ))),
            None => {
                let elapsed = started.elapsed();
                self.terminate();
                tracing::debug!(pid = self.pid(), ?elapsed, "Worker killed after overrun");
                Err(SupervisorError::OverBudget(elapsed))
            }
        }
    }

    /// Next message from the worker, or `None` once `deadline` passes.
    fn next_reply(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<Option<WorkerMessage>, SupervisorError> {
        loop {
            let slice = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Ok(None);
                    }
                    left.min(POLL_SLICE)
                }
                None => POLL_SLICE,
            };

            // A partial frame already in the buffer would block forever if the
            // worker died mid-write
            if self.replies.pending() {
                if !self.is_alive() {
                    return Err(SupervisorError::Died("partial reply buffered".to_string()));
                }
            } else {
                match readiness(self.reply_fd, slice).map_err(|e| {
                    SupervisorError::Died(format!("reply pipe: {}", e))
                })? {
                    Readiness::Readable => {}
                    Readiness::HungUp => {
                        return Err(SupervisorError::Died("reply pipe closed".to_string()));
                    }
                    Readiness::Quiet if self.is_alive() => continue,
                    Readiness::Quiet => {
                        return Err(SupervisorError::Died(exit_description(&mut self.child)));
                    }
                }
            }

            return match self.replies.recv::<WorkerMessage>() {
                Ok(message) => Ok(Some(message)),
                Err(FrameError::EndOfStream) => {
                    Err(SupervisorError::Died("reply stream ended".to_string()))
                }
                Err(_) if !self.is_alive() => {
                    Err(SupervisorError::Died(exit_description(&mut self.child)))
                }
                Err(e) => Err(e.into()),
            };
        }
    }

    /// SIGTERM, drain late replies for a grace period, then SIGKILL.
    fn terminate(&mut self) {
        unsafe {
            libc::kill(self.child.id() as libc::pid_t, libc::SIGTERM);
        }

        let grace_end = Instant::now() + TERM_GRACE;
        while self.is_alive() {
            let left = grace_end.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            // A completion arriving now does not undo the overrun
            match readiness(self.reply_fd, left) {
                Ok(Readiness::Readable) if self.replies.recv::<WorkerMessage>().is_ok() => {}
                _ => break,
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    /// Ask the worker to exit and reap it.
    pub fn shutdown(mut self) -> Result<(), SupervisorError> {
        self.commands.send(&SupervisorCommand::Shutdown)?;
        self.child.wait()?;
        Ok(())
    }

    /// Whether the process is still running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if self.is_alive() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

fn exit_description(child: &mut Child) -> String {
    match child.try_wait() {
        Ok(Some(status)) => format!("worker exited with {}", status),
        Ok(None) => "worker stopped responding".to_string(),
        Err(e) => format!("worker status unavailable: {}", e),
    }
}

/// Turn a worker's wire report back into an execution.
pub fn report_to_execution(outcome: OutcomeReport, duration: Duration) -> Execution {
    let harness = |err: HarnessError| Execution::harness_error(err, duration);

    let raw = match outcome {
        OutcomeReport::Returned { value } => RawOutcome::Returned(value),
        OutcomeReport::Faulted { phrase } => {
            let Some(fault) = OutcomeCategory::from_phrase(&phrase).and_then(Fault::from_category)
            else {
                return harness(HarnessError::Ipc(format!("unknown fault phrase {:?}", phrase)));
            };
            RawOutcome::Faulted(fault)
        }
        OutcomeReport::Unmapped { message } => RawOutcome::Unmapped(message),
        OutcomeReport::Interrupted => return Execution::timeout(duration),
        OutcomeReport::BindFailed { message } => return harness(HarnessError::WorkerBind(message)),
        OutcomeReport::ArgsRejected { message } => {
            return harness(HarnessError::Ipc(format!(
                "worker rejected arguments: {}",
                message
            )));
        }
        OutcomeReport::UnknownMethod { method_id } => {
            return harness(HarnessError::UnknownMethod(method_id));
        }
        OutcomeReport::DuplicateMethod { method_id } => {
            return harness(HarnessError::DuplicateMethodId(method_id));
        }
    };
    Execution::from_raw(raw, duration)
}

/// Fans cases out over a fixed number of worker processes
pub struct Supervisor {
    limits: CallLimits,
    handshake: Duration,
    workers: usize,
    binary: Option<PathBuf>,
}

impl Supervisor {
    /// Supervisor running at most `workers` processes, each given
    /// `handshake` to start.
    pub fn new(limits: CallLimits, handshake: Duration, workers: usize) -> Self {
        Self {
            limits,
            handshake,
            workers: workers.max(1),
            binary: None,
        }
    }

    /// Start workers from `binary` instead of the current executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    fn spawn_worker(&self) -> Result<Worker, SupervisorError> {
        match &self.binary {
            Some(binary) => Worker::spawn_binary(binary, self.handshake),
            None => Worker::spawn(self.handshake),
        }
    }

    /// Run every job and return executions in job order.
    pub fn run_all(
        &self,
        jobs: &[CaseJob],
        on_done: &(dyn Fn() + Sync),
    ) -> Result<Vec<Execution>, SupervisorError> {
        let workers = self.workers.min(jobs.len());
        if workers <= 1 {
            let shard: Vec<(usize, &CaseJob)> = jobs.iter().enumerate().collect();
            return Ok(into_job_order(self.run_shard(&shard, on_done)));
        }

        // Round-robin keeps slow methods (declared together) spread out
        let mut shards = vec![Vec::new(); workers];
        for (index, job) in jobs.iter().enumerate() {
            shards[index % workers].push((index, job));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| SupervisorError::Pool(e.to_string()))?;
        let done: Vec<(usize, Execution)> = pool.install(|| {
            shards
                .par_iter()
                .flat_map_iter(|shard| self.run_shard(shard, on_done))
                .collect()
        });

        if done.len() != jobs.len() {
            return Err(SupervisorError::Pool(format!(
                "{} of {} cases came back",
                done.len(),
                jobs.len()
            )));
        }
        Ok(into_job_order(done))
    }

    /// Run a shard on one worker, replacing it whenever it is lost.
    fn run_shard(
        &self,
        shard: &[(usize, &CaseJob)],
        on_done: &(dyn Fn() + Sync),
    ) -> Vec<(usize, Execution)> {
        let mut worker: Option<Worker> = None;
        let mut done = Vec::with_capacity(shard.len());

        for &(index, job) in shard {
            let execution = self.run_one(&mut worker, job);
            done.push((index, execution));
            on_done();
        }

        if let Some(worker) = worker {
            if let Err(e) = worker.shutdown() {
                tracing::debug!("Worker shutdown: {}", e);
            }
        }
        done
    }

    fn run_one(&self, slot: &mut Option<Worker>, job: &CaseJob) -> Execution {
        if slot.is_none() {
            match self.spawn_worker() {
                Ok(worker) => *slot = Some(worker),
                Err(e) => {
                    tracing::warn!("Failed to spawn worker: {}", e);
                    return crashed(e.to_string());
                }
            }
        }
        let Some(worker) = slot.as_mut() else {
            return crashed("no worker available".to_string());
        };

        match worker.evaluate(job, self.limits) {
            Ok(execution) => execution,
            Err(SupervisorError::OverBudget(elapsed)) => {
                *slot = None;
                Execution::timeout(elapsed)
            }
            Err(e) => {
                tracing::warn!(
                    method = job.method_id,
                    case = job.case_index,
                    "Worker failure: {}",
                    e
                );
                if !worker.is_alive() {
                    *slot = None;
                }
                crashed(e.to_string())
            }
        }
    }
}

fn crashed(message: String) -> Execution {
    Execution::harness_error(HarnessError::WorkerCrashed { message }, Duration::ZERO)
}

fn into_job_order(mut done: Vec<(usize, Execution)>) -> Vec<Execution> {
    done.sort_by_key(|(index, _)| *index);
    done.into_iter().map(|(_, execution)| execution).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxcase_core::Actual;
    use fluxcase_ipc::WorkerCapabilities;

    #[test]
    fn test_report_to_execution() {
        let exec = report_to_execution(
            OutcomeReport::Faulted {
                phrase: "out of bounds".to_string(),
            },
            Duration::from_millis(1),
        );
        assert_eq!(
            exec.result,
            Ok(Actual::Completed(OutcomeCategory::OutOfBounds))
        );

        let exec = report_to_execution(OutcomeReport::Interrupted, Duration::ZERO);
        assert_eq!(exec.result, Ok(Actual::Timeout));

        let exec = report_to_execution(
            OutcomeReport::Returned {
                value: Some("'l'".to_string()),
            },
            Duration::ZERO,
        );
        assert_eq!(exec.result, Ok(Actual::Completed(OutcomeCategory::Ok)));
        assert_eq!(exec.return_value.as_deref(), Some("'l'"));
    }

    #[test]
    fn test_report_errors_are_harness_errors() {
        let exec = report_to_execution(
            OutcomeReport::Faulted {
                phrase: "ok".to_string(),
            },
            Duration::ZERO,
        );
        assert!(matches!(exec.result, Err(HarnessError::Ipc(_))));

        let exec = report_to_execution(
            OutcomeReport::BindFailed {
                message: "arity mismatch: expected 1 argument(s), got 2".to_string(),
            },
            Duration::ZERO,
        );
        assert!(matches!(exec.result, Err(HarnessError::WorkerBind(_))));

        let exec = report_to_execution(
            OutcomeReport::UnknownMethod {
                method_id: "missing".to_string(),
            },
            Duration::ZERO,
        );
        assert_eq!(
            exec.result,
            Err(HarnessError::UnknownMethod("missing".to_string()))
        );

        let exec = report_to_execution(
            OutcomeReport::DuplicateMethod {
                method_id: "shared".to_string(),
            },
            Duration::ZERO,
        );
        assert_eq!(
            exec.result,
            Err(HarnessError::DuplicateMethodId("shared".to_string()))
        );
    }

    #[test]
    fn test_supervisor_clamps_workers() {
        let supervisor = Supervisor::new(CallLimits::default(), Duration::from_secs(1), 0);
        assert_eq!(supervisor.workers, 1);
        assert!(supervisor.run_all(&[], &|| {}).unwrap().is_empty());
    }

    #[test]
    fn test_job_order_restored() {
        let done = vec![
            (2, Execution::timeout(Duration::from_millis(2))),
            (0, Execution::timeout(Duration::from_millis(0))),
            (1, Execution::timeout(Duration::from_millis(1))),
        ];
        let ordered = into_job_order(done);
        let durations: Vec<_> = ordered.iter().map(|e| e.duration.as_millis()).collect();
        assert_eq!(durations, vec![0, 1, 2]);
    }

    #[test]
    fn test_readiness_on_pipe() {
        let (read, write) = pipe().unwrap();
        assert!(matches!(
            readiness(read.as_raw_fd(), Duration::from_millis(10)).unwrap(),
            Readiness::Quiet
        ));

        let mut writer = FrameWriter::new(File::from(write));
        writer
            .send(&WorkerMessage::Hello(WorkerCapabilities::current(2)))
            .unwrap();
        assert!(matches!(
            readiness(read.as_raw_fd(), Duration::from_millis(10)).unwrap(),
            Readiness::Readable
        ));

        drop(writer);
        let mut reader = FrameReader::new(File::from(read));
        assert!(matches!(
            reader.recv::<WorkerMessage>().unwrap(),
            WorkerMessage::Hello(caps) if caps.method_count == 2
        ));
    }
}
