//! Blocking UDP channel abstraction.
//!
//! [`UdpChannel`] is a thin wrapper around `std::net::UdpSocket` bound to an
//! ephemeral local port.  The same port is reused for the whole session —
//! the server targets its replies at the port the request came from.
//!
//! The [`Channel`] trait is the seam that lets the driver run against a
//! scripted fake channel in tests instead of a real socket.  All protocol
//! logic lives elsewhere; this module owns only byte I/O.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use crate::error::TftpError;

/// Receive buffer size: 4-byte header plus a full 512-byte block, with slack.
pub const MAX_DATAGRAM: usize = 600;

/// Send-to / receive-with-timeout over an unreliable datagram transport.
pub trait Channel {
    /// Send one datagram to `dest`.
    fn send(&mut self, frame: &[u8], dest: SocketAddr) -> Result<(), TftpError>;

    /// Block until a datagram arrives or `timeout` elapses, in which case
    /// the call fails with [`TftpError::Timeout`].
    fn recv(&mut self, timeout: Duration) -> Result<(Vec<u8>, SocketAddr), TftpError>;
}

/// A blocking, ephemeral-port UDP channel.
#[derive(Debug)]
pub struct UdpChannel {
    /// Address this channel is bound to (filled in after the OS assigns an
    /// ephemeral port).
    pub local_addr: SocketAddr,
    socket: UdpSocket,
}

impl UdpChannel {
    /// Bind a new channel to an OS-assigned ephemeral port.
    pub fn bind() -> Result<Self, TftpError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        let local_addr = socket.local_addr()?;
        Ok(Self { local_addr, socket })
    }
}

impl Channel for UdpChannel {
    fn send(&mut self, frame: &[u8], dest: SocketAddr) -> Result<(), TftpError> {
        self.socket.send_to(frame, dest)?;
        Ok(())
    }

    fn recv(&mut self, timeout: Duration) -> Result<(Vec<u8>, SocketAddr), TftpError> {
        self.socket.set_read_timeout(Some(timeout))?;
        let mut buf = [0u8; MAX_DATAGRAM];
        // From<io::Error> maps WouldBlock / TimedOut to TftpError::Timeout.
        let (n, src) = self.socket.recv_from(&mut buf)?;
        Ok((buf[..n].to_vec(), src))
    }
}
