//! Crate-wide error type and process exit-code mapping.

use thiserror::Error;

/// Everything that can go wrong during a transfer.
///
/// `Timeout` is the only recoverable variant: the driver retries with a
/// doubled timeout until [`crate::session::MAX_TIMEOUT`] is reached, after
/// which it becomes fatal like the rest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TftpError {
    /// Received bytes do not parse as any known packet shape.
    #[error("malformed packet: {0}")]
    Malformed(String),
    /// A syntactically valid packet whose opcode is never valid for a
    /// read-path client (another request, an inbound ack, or an
    /// unassigned value).
    #[error("unexpected opcode {0}")]
    UnexpectedOpcode(u16),
    /// A data block that is neither the last-acked block nor its successor.
    /// Out-of-order delivery is undefined for this client.
    #[error("block {got} out of sequence (expected {expected})")]
    OutOfSequence { expected: u16, got: u16 },
    /// The server sent an ERROR packet; code and message are surfaced as-is.
    #[error("Error Code {code}: {message}")]
    Remote { code: u16, message: String },
    /// No datagram arrived within the current timeout.
    #[error("timeout communicating with the server")]
    Timeout,
    /// Socket or file I/O failure.
    #[error("network error: {0}")]
    Network(String),
}

impl TftpError {
    /// Process exit code for this failure.
    ///
    /// A server-reported error exits with the protocol error code; every
    /// local failure exits with the generic code 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            TftpError::Remote { code, .. } => i32::from(*code),
            _ => 1,
        }
    }
}

impl From<std::io::Error> for TftpError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        // A blocking socket with a read timeout reports WouldBlock on Unix
        // and TimedOut on Windows.
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TftpError::Timeout,
            _ => TftpError::Network(err.to_string()),
        }
    }
}
