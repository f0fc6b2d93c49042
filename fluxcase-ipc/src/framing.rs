//! Frames
//!
//! Every message travels as one frame:
//!
//! ```text
//! +-------------+----------------+------------------+
//! | version (1) | length (4, LE) | rkyv payload     |
//! +-------------+----------------+------------------+
//! ```
//!
//! The version byte lets a worker built from a different tree fail loudly
//! instead of misreading an archive.

use crate::PROTOCOL_VERSION;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{AlignedVec, Archive, CheckBytes, Deserialize, Infallible, Serialize};
use std::io::{self, BufReader, BufWriter, Read, Write};
use thiserror::Error;

/// Largest payload accepted. Case arguments are short literal lists.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

const HEADER_LEN: usize = 5;

/// Errors while sending or receiving frames
#[derive(Debug, Error)]
pub enum FrameError {
    /// Pipe read or write failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// rkyv could not serialize the message
    #[error("encoding failed: {0}")]
    Encode(String),

    /// The payload failed validation
    #[error("malformed payload: {0}")]
    Decode(String),

    /// Length prefix above [`MAX_FRAME_SIZE`]
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Announced payload length
        size: usize,
        /// Limit in force
        max: usize,
    },

    /// The peer was built with another protocol version
    #[error("peer speaks protocol v{got}, expected v{expected}")]
    VersionMismatch {
        /// Our version
        expected: u8,
        /// Version byte received
        got: u8,
    },

    /// Length prefix of zero
    #[error("empty frame")]
    EmptyFrame,

    /// The peer closed the pipe between frames
    #[error("End of stream")]
    EndOfStream,
}

fn protocol_byte() -> u8 {
    u8::try_from(PROTOCOL_VERSION).unwrap_or(u8::MAX)
}

fn check_len(size: usize) -> Result<(), FrameError> {
    match size {
        0 => Err(FrameError::EmptyFrame),
        size if size > MAX_FRAME_SIZE => Err(FrameError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        }),
        _ => Ok(()),
    }
}

/// Sending half of a pipe
pub struct FrameWriter<W: Write> {
    inner: BufWriter<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Buffered writer over `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            inner: BufWriter::with_capacity(8 * 1024, writer),
        }
    }

    /// Encode `message` as one frame and flush it to the peer.
    pub fn send<T>(&mut self, message: &T) -> Result<(), FrameError>
    where
        T: Serialize<AllocSerializer<256>>,
    {
        let payload =
            rkyv::to_bytes::<_, 256>(message).map_err(|e| FrameError::Encode(e.to_string()))?;
        check_len(payload.len())?;

        let mut header = [0u8; HEADER_LEN];
        header[0] = protocol_byte();
        header[1..].copy_from_slice(&(payload.len() as u32).to_le_bytes());

        self.inner.write_all(&header)?;
        self.inner.write_all(&payload)?;
        self.inner.flush()?;
        Ok(())
    }
}

/// Receiving half of a pipe
pub struct FrameReader<R: Read> {
    inner: BufReader<R>,
}

impl<R: Read> FrameReader<R> {
    /// Buffered reader over `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(8 * 1024, reader),
        }
    }

    /// Block until a whole frame arrives and decode it.
    pub fn recv<T>(&mut self) -> Result<T, FrameError>
    where
        T: Archive,
        T::Archived: for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<T, Infallible>,
    {
        let mut header = [0u8; HEADER_LEN];
        if let Err(e) = self.inner.read_exact(&mut header) {
            return Err(match e.kind() {
                io::ErrorKind::UnexpectedEof => FrameError::EndOfStream,
                _ => FrameError::Io(e),
            });
        }

        if header[0] != protocol_byte() {
            return Err(FrameError::VersionMismatch {
                expected: protocol_byte(),
                got: header[0],
            });
        }

        let mut len = [0u8; 4];
        len.copy_from_slice(&header[1..]);
        let len = u32::from_le_bytes(len) as usize;
        check_len(len)?;

        let mut payload = AlignedVec::with_capacity(len);
        payload.resize(len, 0);
        self.inner.read_exact(&mut payload)?;

        rkyv::check_archived_root::<T>(&payload)
            .map_err(|e| FrameError::Decode(e.to_string()))?
            .deserialize(&mut Infallible)
            .map_err(|_| FrameError::Decode("archived value rejected".to_string()))
    }

    /// Bytes already pulled off the pipe but not yet decoded.
    pub fn pending(&self) -> bool {
        !self.inner.buffer().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CaseRequest, OutcomeReport, SupervisorCommand, WorkerCapabilities, WorkerMessage};
    use std::io::Cursor;

    fn encode<T: Serialize<AllocSerializer<256>>>(messages: &[T]) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut writer = FrameWriter::new(&mut buffer);
        for message in messages {
            writer.send(message).unwrap();
        }
        drop(writer);
        buffer
    }

    #[test]
    fn test_command_stream() {
        let buffer = encode(&[
            SupervisorCommand::Run(CaseRequest {
                method_id: "tricky::collatz".to_string(),
                case_index: 1,
                args: "(24)".to_string(),
                max_depth: 1000,
                max_steps: Some(10_000),
            }),
            SupervisorCommand::Shutdown,
        ]);

        let mut reader = FrameReader::new(Cursor::new(buffer));
        match reader.recv::<SupervisorCommand>().unwrap() {
            SupervisorCommand::Run(req) => {
                assert_eq!(req.method_id, "tricky::collatz");
                assert_eq!(req.max_steps, Some(10_000));
            }
            other => panic!("expected Run, got {:?}", other),
        }
        assert!(reader.pending());
        assert!(matches!(
            reader.recv::<SupervisorCommand>().unwrap(),
            SupervisorCommand::Shutdown
        ));
        assert!(!reader.pending());
        assert!(matches!(
            reader.recv::<SupervisorCommand>(),
            Err(FrameError::EndOfStream)
        ));
    }

    #[test]
    fn test_outcome_message() {
        let buffer = encode(&[WorkerMessage::CaseCompleted {
            outcome: OutcomeReport::Faulted {
                phrase: "divide by zero".to_string(),
            },
            duration_nanos: 1_500,
        }]);

        let mut reader = FrameReader::new(Cursor::new(buffer));
        match reader.recv::<WorkerMessage>().unwrap() {
            WorkerMessage::CaseCompleted {
                outcome,
                duration_nanos,
            } => {
                assert_eq!(
                    outcome,
                    OutcomeReport::Faulted {
                        phrase: "divide by zero".to_string()
                    }
                );
                assert_eq!(duration_nanos, 1_500);
            }
            other => panic!("expected CaseCompleted, got {:?}", other),
        }
    }

    #[test]
    fn test_version_mismatch() {
        let mut buffer = encode(&[WorkerMessage::Hello(WorkerCapabilities::current(1))]);
        buffer[0] = buffer[0].wrapping_add(1);

        let mut reader = FrameReader::new(Cursor::new(buffer));
        let result: Result<WorkerMessage, _> = reader.recv();
        assert!(matches!(result, Err(FrameError::VersionMismatch { .. })));
    }

    #[test]
    fn test_oversized_and_empty_frames() {
        let mut buffer = vec![protocol_byte()];
        buffer.extend_from_slice(&((MAX_FRAME_SIZE + 1) as u32).to_le_bytes());
        let mut reader = FrameReader::new(Cursor::new(buffer));
        let result: Result<WorkerMessage, _> = reader.recv();
        assert!(matches!(result, Err(FrameError::FrameTooLarge { .. })));

        let buffer = vec![protocol_byte(), 0, 0, 0, 0];
        let mut reader = FrameReader::new(Cursor::new(buffer));
        let result: Result<WorkerMessage, _> = reader.recv();
        assert!(matches!(result, Err(FrameError::EmptyFrame)));
    }

    #[test]
    fn test_truncated_header_is_end_of_stream() {
        let mut reader = FrameReader::new(Cursor::new(vec![protocol_byte(), 3]));
        let result: Result<WorkerMessage, _> = reader.recv();
        assert!(matches!(result, Err(FrameError::EndOfStream)));
    }
}
