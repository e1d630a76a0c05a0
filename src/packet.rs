//! Wire-format definitions for TFTP packets (RFC 1350 subset).
//!
//! Every datagram exchanged with the server is one of five shapes.  This
//! module is responsible for:
//! - Defining the on-wire binary layout.
//! - Serialising outbound requests and acks into byte buffers.
//! - Deserialising a raw byte slice back into a [`Packet`], returning errors
//!   for malformed or truncated input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  RRQ/WRQ  | opcode:2 | filename ... | 0x00 | mode ... | 0x00 |
//!  DATA     | opcode:2 | block:2 | payload (0–512 bytes)       |
//!  ACK      | opcode:2 | block:2 |
//!  ERROR    | opcode:2 | code:2  | message (UTF-8, to end of datagram) |
//! ```
//!
//! A DATA payload strictly shorter than [`BLOCK_SIZE`] marks the final
//! block of a transfer.

use crate::error::TftpError;

/// Maximum payload bytes carried by one DATA packet.
pub const BLOCK_SIZE: usize = 512;

/// The server's well-known listening port for initial requests.
pub const TFTP_PORT: u16 = 69;

/// Binary ("octet") transfer mode — the only mode this client speaks.
pub const MODE_OCTET: &str = "octet";

// Every packet body starts after the 2-byte opcode; DATA/ACK/ERROR all
// carry one more 2-byte field before their variable tail.
const MIN_BODY_LEN: usize = 4;

/// Message-type discriminator at the start of every packet.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    ReadRequest = 1,
    WriteRequest = 2,
    Data = 3,
    Ack = 4,
    Error = 5,
}

impl Opcode {
    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

/// A decoded inbound datagram.
///
/// Read/write requests never arrive at a client, so they decode to
/// [`Packet::Unknown`] together with unassigned opcode values; the session
/// layer rejects both as protocol violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// One block of file data.  `payload.len() < BLOCK_SIZE` ⇒ final block.
    Data { block: u16, payload: Vec<u8> },
    /// Acknowledgement of one block.
    Ack { block: u16 },
    /// Server-side failure; terminates the transfer.
    Error { code: u16, message: String },
    /// Any opcode this client never accepts.
    Unknown { opcode: u16 },
}

impl Packet {
    /// Serialise this packet into a newly allocated byte vector.
    ///
    /// `Unknown` encodes as its bare opcode; it exists only so that tests
    /// can fabricate invalid traffic.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Packet::Data { block, payload } => {
                let mut buf = Vec::with_capacity(MIN_BODY_LEN + payload.len());
                buf.extend_from_slice(&Opcode::Data.to_u16().to_be_bytes());
                buf.extend_from_slice(&block.to_be_bytes());
                buf.extend_from_slice(payload);
                buf
            }
            Packet::Ack { block } => encode_ack(*block),
            Packet::Error { code, message } => {
                let mut buf = Vec::with_capacity(MIN_BODY_LEN + message.len());
                buf.extend_from_slice(&Opcode::Error.to_u16().to_be_bytes());
                buf.extend_from_slice(&code.to_be_bytes());
                buf.extend_from_slice(message.as_bytes());
                buf
            }
            Packet::Unknown { opcode } => opcode.to_be_bytes().to_vec(),
        }
    }

    /// Parse a [`Packet`] from a raw datagram.
    ///
    /// Returns [`TftpError::Malformed`] when fewer than 2 bytes are present,
    /// when a DATA/ACK/ERROR body is shorter than its 4-byte minimum, or
    /// when an ERROR message tail is not valid UTF-8.
    pub fn decode(buf: &[u8]) -> Result<Self, TftpError> {
        if buf.len() < 2 {
            return Err(TftpError::Malformed("datagram shorter than an opcode".into()));
        }
        let opcode = u16::from_be_bytes([buf[0], buf[1]]);

        match opcode {
            op if op == Opcode::Data.to_u16() => {
                if buf.len() < MIN_BODY_LEN {
                    return Err(TftpError::Malformed("DATA packet missing block number".into()));
                }
                Ok(Packet::Data {
                    block: u16::from_be_bytes([buf[2], buf[3]]),
                    payload: buf[MIN_BODY_LEN..].to_vec(),
                })
            }
            op if op == Opcode::Ack.to_u16() => {
                if buf.len() < MIN_BODY_LEN {
                    return Err(TftpError::Malformed("ACK packet missing block number".into()));
                }
                Ok(Packet::Ack {
                    block: u16::from_be_bytes([buf[2], buf[3]]),
                })
            }
            op if op == Opcode::Error.to_u16() => {
                if buf.len() < MIN_BODY_LEN {
                    return Err(TftpError::Malformed("ERROR packet missing error code".into()));
                }
                let message = String::from_utf8(buf[MIN_BODY_LEN..].to_vec())
                    .map_err(|_| TftpError::Malformed("ERROR message is not UTF-8".into()))?;
                Ok(Packet::Error {
                    code: u16::from_be_bytes([buf[2], buf[3]]),
                    message,
                })
            }
            other => Ok(Packet::Unknown { opcode: other }),
        }
    }
}

/// Build a read/write request: `[opcode:2][filename][0x00][mode][0x00]`.
///
/// Filename and mode are UTF-8 and NUL-terminated individually; an embedded
/// NUL in either produces a request the server cannot parse (not validated
/// here).
pub fn encode_request(opcode: Opcode, filename: &str, mode: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + filename.len() + 1 + mode.len() + 1);
    buf.extend_from_slice(&opcode.to_u16().to_be_bytes());
    buf.extend_from_slice(filename.as_bytes());
    buf.push(0);
    buf.extend_from_slice(mode.as_bytes());
    buf.push(0);
    buf
}

/// Build an acknowledgement: `[0x0004][block:2]`.
pub fn encode_ack(block: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MIN_BODY_LEN);
    buf.extend_from_slice(&Opcode::Ack.to_u16().to_be_bytes());
    buf.extend_from_slice(&block.to_be_bytes());
    buf
}
