//! Transfer state machine for one read-path session.
//!
//! [`Session`] owns the sequencing logic of a transfer: which block is
//! expected, what to do on receipt of data/error packets, when to
//! retransmit, and when the transfer is complete.
//!
//! # Protocol contract
//!
//! - The server replies from a transfer-specific ephemeral port distinct
//!   from its well-known listening port.  The source of the first response
//!   is recorded as the bound peer; datagrams from any other source are
//!   discarded without side effects.
//! - A data block equal to the last-acked block is a retransmission (the
//!   earlier ack was presumably lost): it is not written again but is
//!   re-acked.
//! - A payload shorter than [`BLOCK_SIZE`] marks the final block.
//! - A receive timeout doubles the wait and re-sends the most recent
//!   outgoing frame (the request while awaiting the first response, the
//!   last ack afterwards).  Once the doubled wait would exceed
//!   [`MAX_TIMEOUT`] the session fails instead of retrying.
//!
//! This module only manages state; all socket and file I/O is the caller's
//! responsibility (see [`crate::client`]).

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::TftpError;
use crate::packet::{encode_ack, Packet, BLOCK_SIZE};

/// Receive timeout for the first wait of a session.
pub const INITIAL_TIMEOUT: Duration = Duration::from_secs(3);

/// Backoff ceiling: the session fails once the next doubling would pass it.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// State and instruction types
// ---------------------------------------------------------------------------

/// Lifecycle of a session.  `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Request sent; no response seen yet, peer not bound.
    AwaitingReply,
    /// First response received; blocks are flowing.
    Transferring,
    /// Final (short) block received and acked.
    Completed,
    /// Protocol error, remote error, or exhausted backoff.
    Failed,
}

/// What the driver must do after feeding one received datagram in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Append `data` to the output, then send `ack` to `dest`.
    Write {
        block: u16,
        data: Vec<u8>,
        ack: Vec<u8>,
        dest: SocketAddr,
    },
    /// Duplicate of an already-written block: send `ack` only.
    Ack {
        block: u16,
        ack: Vec<u8>,
        dest: SocketAddr,
    },
    /// Stray datagram from an unrelated source: no side effect.
    Ignore,
    /// Terminal failure; the driver reports `error` to the caller.
    Fail(TftpError),
}

/// What the driver must do after a receive timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retry {
    /// Re-send `frame` to `dest` and wait again (with the doubled timeout).
    Resend { frame: Vec<u8>, dest: SocketAddr },
    /// Backoff ceiling reached; give up.
    GiveUp(TftpError),
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Mutable state for one transfer.
///
/// Created when the read request is sent, mutated on every received
/// datagram, terminal after the first sub-512-byte block (success) or the
/// first error/exhausted backoff (failure).
#[derive(Debug)]
pub struct Session {
    state: State,
    /// Destination for outgoing frames: the well-known server address until
    /// the first response binds the server's ephemeral reply port.
    dest: SocketAddr,
    /// Bound peer address, learned from the first response.
    peer: Option<SocketAddr>,
    /// Last acknowledged block; `None` until the first block is written, so
    /// a genuine block number can never masquerade as a duplicate.
    last_acked: Option<u16>,
    bytes_received: u64,
    timeout: Duration,
    /// Most recent outgoing frame (the request, later the last ack), kept
    /// for retransmission after a timeout.
    last_sent: Vec<u8>,
}

impl Session {
    /// Start a session for a just-sent `request` addressed to `server`.
    pub fn new(request: Vec<u8>, server: SocketAddr) -> Self {
        Self {
            state: State::AwaitingReply,
            dest: server,
            peer: None,
            last_acked: None,
            bytes_received: 0,
            timeout: INITIAL_TIMEOUT,
            last_sent: request,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == State::Completed
    }

    /// Total payload bytes accepted so far (duplicates excluded).
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Timeout to use for the next receive.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Bound peer address, once the first response has arrived.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Feed one raw datagram received from `src` into the state machine.
    ///
    /// Decodes the frame, applies the transition rules, and returns the
    /// I/O the driver must perform.  The session moves to a terminal state
    /// on the final block, on any protocol violation, and on a server
    /// error.
    pub fn on_datagram(&mut self, frame: &[u8], src: SocketAddr) -> Action {
        if matches!(self.state, State::Completed | State::Failed) {
            return Action::Ignore;
        }

        match self.peer {
            // First response: bind the server's ephemeral reply port.
            None => {
                self.peer = Some(src);
                self.dest = src;
                self.state = State::Transferring;
            }
            Some(peer) if peer != src => return Action::Ignore,
            Some(_) => {}
        }

        let packet = match Packet::decode(frame) {
            Ok(p) => p,
            Err(e) => return self.fail(e),
        };

        match packet {
            Packet::Data { block, payload } => self.on_data(block, payload),
            Packet::Error { code, message } => self.fail(TftpError::Remote { code, message }),
            Packet::Ack { .. } => self.fail(TftpError::UnexpectedOpcode(4)),
            Packet::Unknown { opcode } => self.fail(TftpError::UnexpectedOpcode(opcode)),
        }
    }

    /// Consult the backoff policy after a receive timeout.
    ///
    /// Doubles the timeout and instructs a retransmission of the most
    /// recent outgoing frame, or gives up once the doubled timeout would
    /// exceed [`MAX_TIMEOUT`].
    pub fn on_timeout(&mut self) -> Retry {
        let doubled = self.timeout * 2;
        if doubled > MAX_TIMEOUT {
            self.state = State::Failed;
            return Retry::GiveUp(TftpError::Timeout);
        }
        self.timeout = doubled;
        Retry::Resend {
            frame: self.last_sent.clone(),
            dest: self.dest,
        }
    }

    fn on_data(&mut self, block: u16, payload: Vec<u8>) -> Action {
        let final_block = payload.len() < BLOCK_SIZE;
        let ack = encode_ack(block);

        if Some(block) == self.last_acked {
            // Retransmitted block — the earlier ack was lost.  Re-ack
            // without writing; a re-sent final block still completes.
            self.last_sent = ack.clone();
            if final_block {
                self.state = State::Completed;
            }
            return Action::Ack {
                block,
                ack,
                dest: self.dest,
            };
        }

        let expected = self.last_acked.map_or(1, |b| b.wrapping_add(1));
        if block != expected {
            return self.fail(TftpError::OutOfSequence {
                expected,
                got: block,
            });
        }

        self.last_acked = Some(block);
        self.bytes_received += payload.len() as u64;
        self.last_sent = ack.clone();
        if final_block {
            self.state = State::Completed;
        }
        Action::Write {
            block,
            data: payload,
            ack,
            dest: self.dest,
        }
    }

    fn fail(&mut self, error: TftpError) -> Action {
        self.state = State::Failed;
        Action::Fail(error)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
