#![warn(missing_docs)]
//! Fluxcase IPC Protocol
//!
//! Versioned, length-prefixed rkyv frames between the supervisor and isolated worker
//! processes: case requests one way, observed outcomes the other.

mod framing;
mod messages;

pub use framing::{FrameError, FrameReader, FrameWriter, MAX_FRAME_SIZE};
pub use messages::{
    CaseRequest, OutcomeReport, SupervisorCommand, WorkerCapabilities, WorkerMessage,
};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Environment variable carrying the worker's `<read_fd>,<write_fd>` pair
pub const IPC_FD_ENV: &str = "FLUXCASE_IPC_FD";

/// Hidden flag that turns the binary into a worker
pub const WORKER_FLAG: &str = "--flux-worker";
