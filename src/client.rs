//! Session driver: orchestrates the codec, state machine, and channel.
//!
//! [`fetch`] runs one transfer over any [`Channel`] into any `io::Write`
//! sink, which is how the scenario tests drive the protocol without real
//! sockets.  [`fetch_file`] is the production entry point: it resolves the
//! server address, binds a real UDP channel, and writes to a local file
//! named after the requested file.

use std::fs::File;
use std::io::Write;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::channel::{Channel, UdpChannel};
use crate::error::TftpError;
use crate::packet::{encode_request, Opcode, MODE_OCTET, TFTP_PORT};
use crate::session::{Action, Retry, Session};

/// Run one read transfer over `channel`, writing received blocks to `out`.
///
/// Sends the read request for `filename` to `server`, then loops: wait for
/// a datagram (bounded by the session's current timeout), feed it to the
/// state machine, and perform the resulting I/O.  Returns the total number
/// of payload bytes written once the final block has been acked.
pub fn fetch<C: Channel, W: Write>(
    channel: &mut C,
    server: SocketAddr,
    filename: &str,
    out: &mut W,
) -> Result<u64, TftpError> {
    let request = encode_request(Opcode::ReadRequest, filename, MODE_OCTET);
    log::debug!("[tftp] → RRQ {filename:?} to {server}");
    channel.send(&request, server)?;
    let mut session = Session::new(request, server);

    loop {
        match channel.recv(session.timeout()) {
            Ok((frame, src)) => match session.on_datagram(&frame, src) {
                Action::Write {
                    block,
                    data,
                    ack,
                    dest,
                } => {
                    out.write_all(&data)?;
                    channel.send(&ack, dest)?;
                    log::debug!("[tftp] ← DATA block={block} len={}; → ACK", data.len());
                }
                Action::Ack { block, ack, dest } => {
                    channel.send(&ack, dest)?;
                    log::debug!("[tftp] ← duplicate DATA block={block}; → ACK");
                }
                Action::Ignore => {
                    log::debug!("[tftp] ignoring stray datagram from {src}");
                }
                Action::Fail(error) => {
                    log::debug!("[tftp] transfer failed: {error}");
                    return Err(error);
                }
            },
            Err(TftpError::Timeout) => match session.on_timeout() {
                Retry::Resend { frame, dest } => {
                    log::debug!("[tftp] timeout — retransmitting to {dest}");
                    channel.send(&frame, dest)?;
                }
                Retry::GiveUp(error) => return Err(error),
            },
            Err(e) => return Err(e),
        }

        if session.is_complete() {
            log::debug!(
                "[tftp] transfer complete: {} byte(s)",
                session.bytes_received()
            );
            return Ok(session.bytes_received());
        }
    }
}

/// Fetch `filename` from the TFTP server at `server` into a local file of
/// the same name.
///
/// The destination file is created **before** the request is sent, so a
/// request is never sent without somewhere to write.  The file handle and
/// the socket are released on every exit path.
pub fn fetch_file(server: &str, filename: &str) -> Result<u64, TftpError> {
    let addr: SocketAddr = format!("{server}:{TFTP_PORT}")
        .to_socket_addrs()
        .map_err(|e| TftpError::Network(e.to_string()))?
        .next()
        .ok_or_else(|| TftpError::Network("invalid server address".into()))?;

    let mut channel = UdpChannel::bind()?;
    let mut file = File::create(filename)?;
    fetch(&mut channel, addr, filename, &mut file)
}
