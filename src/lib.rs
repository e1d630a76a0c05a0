//! `tftp-fetch` — the read path of TFTP (RFC 1350) over UDP.
//!
//! Requests a named file from a remote server and reconstructs it locally
//! from a sequence of 512-byte data blocks, acknowledging each, detecting
//! duplicates, and terminating on the first short (final) block or on a
//! protocol-level error.
//!
//! # Architecture
//!
//! ```text
//!  ┌─────────────┐  raw frames   ┌───────────┐
//!  │   client    │──────────────▶│  session  │  (pure state machine:
//!  │  (driver)   │◀──────────────│           │   sequencing, backoff)
//!  └──────┬──────┘   actions     └───────────┘
//!         │ datagrams
//!  ┌──────▼──────┐               ┌───────────┐
//!  │   channel   │               │  packet   │  (wire codec, pure)
//!  └─────────────┘               └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]  — wire format (serialise / deserialise)
//! - [`session`] — transfer state machine (sequencing, duplicates, backoff)
//! - [`channel`] — blocking UDP channel with receive timeout
//! - [`client`]  — session driver (request, receive loop, output file)
//! - [`error`]   — crate-wide error type and exit-code mapping

pub mod channel;
pub mod client;
pub mod error;
pub mod packet;
pub mod session;

pub use channel::{Channel, UdpChannel};
pub use client::{fetch, fetch_file};
pub use error::TftpError;
pub use packet::{encode_ack, encode_request, Opcode, Packet};
pub use session::Session;
