//! IPC Message Types
//!
//! All messages are serialized with rkyv. Argument vectors travel as their
//! canonical literal text and are re-parsed by the worker.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};

/// One case to evaluate in the worker.
#[derive(Debug, Clone, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct CaseRequest {
    /// Qualified method id
    pub method_id: String,
    /// Declaration index of the case, echoed back for tracing
    pub case_index: u32,
    /// Canonical argument text, e.g. `("hello", 5)`
    pub args: String,
    /// Maximum call depth before a stack overflow is raised
    pub max_depth: u32,
    /// Optional step budget counted at checkpoints
    pub max_steps: Option<u64>,
}

impl CaseRequest {
    /// Validate request fields, returning a description of the first error found.
    pub fn validate(&self) -> Result<(), String> {
        if self.method_id.is_empty() {
            return Err("method_id must not be empty".to_string());
        }
        if self.max_depth == 0 {
            return Err("max_depth must be > 0".to_string());
        }
        if !self.args.trim_start().starts_with('(') {
            return Err(format!("args must be a parenthesised list, got {:?}", self.args));
        }
        Ok(())
    }
}

/// Outcome of one case as observed in the worker.
#[derive(Debug, Clone, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum OutcomeReport {
    /// Normal return, with the rendered return value if any
    Returned {
        /// `Debug` text of a non-unit return value
        value: Option<String>,
    },
    /// A typed fault escaped the method
    Faulted {
        /// Outcome phrase of the fault's category
        phrase: String,
    },
    /// The call stopped at a checkpoint after its step budget ran out
    Interrupted,
    /// A panic outside the taxonomy
    Unmapped {
        /// Panic message
        message: String,
    },
    /// Arguments did not fit the method signature
    BindFailed {
        /// Binding diagnostic
        message: String,
    },
    /// The argument text did not parse in the worker
    ArgsRejected {
        /// Parse diagnostic
        message: String,
    },
    /// The worker binary has no method with this id
    UnknownMethod {
        /// Requested id
        method_id: String,
    },
    /// The worker binary has more than one method with this id
    DuplicateMethod {
        /// Requested id
        method_id: String,
    },
}

/// Worker capabilities advertised during handshake
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct WorkerCapabilities {
    /// Protocol version for compatibility
    pub protocol_version: u32,
    /// Worker process id
    pub pid: u32,
    /// Number of methods registered in the worker binary
    pub method_count: u32,
}

impl WorkerCapabilities {
    /// Capabilities of the current process
    pub fn current(method_count: usize) -> Self {
        Self {
            protocol_version: crate::PROTOCOL_VERSION,
            pid: std::process::id(),
            method_count: u32::try_from(method_count).unwrap_or(u32::MAX),
        }
    }
}

/// Messages sent from Worker to Supervisor
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum WorkerMessage {
    /// Initial handshake with worker capabilities
    Hello(WorkerCapabilities),

    /// A case finished (normally, by fault, or by interruption)
    CaseCompleted {
        /// What the call did
        outcome: OutcomeReport,
        /// Wall-clock time of the call in nanoseconds
        duration_nanos: u64,
    },
}

/// Commands sent from Supervisor to Worker
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum SupervisorCommand {
    /// Evaluate one case
    Run(CaseRequest),

    /// Request graceful shutdown
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CaseRequest {
        CaseRequest {
            method_id: "corpus::strings::char_at".to_string(),
            case_index: 0,
            args: "(\"hello\", 5)".to_string(),
            max_depth: 1000,
            max_steps: None,
        }
    }

    #[test]
    fn test_request_validate_default() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_request_validate_zero_depth() {
        let req = CaseRequest {
            max_depth: 0,
            ..request()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_request_validate_bare_args() {
        let req = CaseRequest {
            args: "1, 2".to_string(),
            ..request()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_worker_capabilities_current() {
        let caps = WorkerCapabilities::current(3);
        assert_eq!(caps.protocol_version, crate::PROTOCOL_VERSION);
        assert_eq!(caps.method_count, 3);
        assert_eq!(caps.pid, std::process::id());
    }
}
