//! Scenario tests for the transfer driver.
//!
//! Most tests drive [`tftp_fetch::fetch`] over a scripted [`FakeChannel`]
//! so loss, duplication, and server errors are deterministic.  The last
//! test exchanges real datagrams with a scripted server thread on the
//! loopback interface.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use tftp_fetch::packet::{encode_ack, encode_request, Opcode, Packet, BLOCK_SIZE, MODE_OCTET};
use tftp_fetch::{fetch, Channel, TftpError};

// ---------------------------------------------------------------------------
// Fake channel
// ---------------------------------------------------------------------------

/// One scripted inbound event.
enum Event {
    /// A datagram "arrives" from the given source address.
    Frame(Vec<u8>, SocketAddr),
    /// The receive times out.
    Timeout,
}

/// A channel that replays a fixed script of inbound events and records
/// every outbound frame.
struct FakeChannel {
    script: VecDeque<Event>,
    sent: Vec<(Vec<u8>, SocketAddr)>,
}

impl FakeChannel {
    fn new(script: Vec<Event>) -> Self {
        Self {
            script: script.into(),
            sent: Vec::new(),
        }
    }
}

impl Channel for FakeChannel {
    fn send(&mut self, frame: &[u8], dest: SocketAddr) -> Result<(), TftpError> {
        self.sent.push((frame.to_vec(), dest));
        Ok(())
    }

    fn recv(&mut self, _timeout: Duration) -> Result<(Vec<u8>, SocketAddr), TftpError> {
        match self.script.pop_front() {
            Some(Event::Frame(frame, src)) => Ok((frame, src)),
            // An exhausted script keeps timing out, like a dead server.
            Some(Event::Timeout) | None => Err(TftpError::Timeout),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn well_known() -> SocketAddr {
    "198.51.100.7:69".parse().unwrap()
}

/// The transfer-specific ephemeral port the server replies from.
fn reply_port() -> SocketAddr {
    "198.51.100.7:49152".parse().unwrap()
}

fn data(block: u16, payload: Vec<u8>) -> Event {
    Event::Frame(Packet::Data { block, payload }.encode(), reply_port())
}

fn rrq(filename: &str) -> Vec<u8> {
    encode_request(Opcode::ReadRequest, filename, MODE_OCTET)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Scenario A: two blocks (512 + 300 bytes), both acked, 812 bytes total.
#[test]
fn two_block_transfer() {
    let mut chan = FakeChannel::new(vec![
        data(1, vec![0xAA; BLOCK_SIZE]),
        data(2, vec![0xBB; 300]),
    ]);
    let mut out = Vec::new();

    let n = fetch(&mut chan, well_known(), "a.bin", &mut out).unwrap();

    assert_eq!(n, 812);
    assert_eq!(out.len(), 812);
    assert_eq!(&out[..BLOCK_SIZE], &[0xAA; BLOCK_SIZE][..]);
    assert_eq!(&out[BLOCK_SIZE..], &[0xBB; 300][..]);

    // Request to the well-known port, both acks to the reply port.
    assert_eq!(chan.sent.len(), 3);
    assert_eq!(chan.sent[0], (rrq("a.bin"), well_known()));
    assert_eq!(chan.sent[1], (encode_ack(1), reply_port()));
    assert_eq!(chan.sent[2], (encode_ack(2), reply_port()));
}

/// Scenario B: the ack for block 1 is lost and the server re-sends the
/// block — the client re-acks without re-writing.
#[test]
fn lost_ack_duplicate_block_not_rewritten() {
    let mut chan = FakeChannel::new(vec![
        data(1, vec![0x11; BLOCK_SIZE]),
        data(1, vec![0x11; BLOCK_SIZE]), // retransmission
        data(2, vec![0x22; 100]),
    ]);
    let mut out = Vec::new();

    let n = fetch(&mut chan, well_known(), "b.bin", &mut out).unwrap();

    assert_eq!(n, 612);
    assert_eq!(out.len(), 612);

    // Block 1 was acked twice, block 2 once.
    let acks: Vec<&Vec<u8>> = chan.sent[1..].iter().map(|(f, _)| f).collect();
    assert_eq!(acks, vec![&encode_ack(1), &encode_ack(1), &encode_ack(2)]);
}

/// Scenario C: the server reports "File not found" — the client fails with
/// the protocol error code and writes nothing.
#[test]
fn server_error_surfaces_code_and_message() {
    let frame = Packet::Error {
        code: 1,
        message: "File not found".into(),
    }
    .encode();
    let mut chan = FakeChannel::new(vec![Event::Frame(frame, reply_port())]);
    let mut out = Vec::new();

    let err = fetch(&mut chan, well_known(), "missing.bin", &mut out).unwrap_err();

    assert_eq!(
        err,
        TftpError::Remote {
            code: 1,
            message: "File not found".into()
        }
    );
    assert_eq!(err.exit_code(), 1);
    assert!(out.is_empty());
    // No ack is sent for an error packet.
    assert_eq!(chan.sent.len(), 1);
}

/// Scenario D: no response ever arrives — the request is retransmitted
/// with a doubling timeout until the ceiling is exceeded.
#[test]
fn dead_server_retransmits_then_times_out() {
    let mut chan = FakeChannel::new(vec![]);
    let mut out = Vec::new();

    let err = fetch(&mut chan, well_known(), "d.bin", &mut out).unwrap_err();

    assert_eq!(err, TftpError::Timeout);
    assert!(out.is_empty());

    // Initial request at 3 s, one retransmission at 6 s, then the next
    // doubling would exceed the 10 s ceiling.
    assert_eq!(chan.sent.len(), 2);
    assert_eq!(chan.sent[0], (rrq("d.bin"), well_known()));
    assert_eq!(chan.sent[1], (rrq("d.bin"), well_known()));
}

/// A single short first block completes immediately.
#[test]
fn single_short_block_transfer() {
    let mut chan = FakeChannel::new(vec![data(1, vec![0x5C; 77])]);
    let mut out = Vec::new();

    let n = fetch(&mut chan, well_known(), "small.bin", &mut out).unwrap();
    assert_eq!(n, 77);
    assert_eq!(out, vec![0x5C; 77]);
}

/// An empty first block is a valid zero-byte file.
#[test]
fn empty_file_transfer() {
    let mut chan = FakeChannel::new(vec![data(1, vec![])]);
    let mut out = Vec::new();

    let n = fetch(&mut chan, well_known(), "empty.bin", &mut out).unwrap();
    assert_eq!(n, 0);
    assert!(out.is_empty());
}

/// Datagrams from sources other than the bound peer are discarded.
#[test]
fn stray_datagram_is_ignored() {
    let stray: SocketAddr = "203.0.113.9:2000".parse().unwrap();
    let mut chan = FakeChannel::new(vec![
        data(1, vec![0x01; BLOCK_SIZE]),
        Event::Frame(
            Packet::Data {
                block: 9,
                payload: vec![0xEE; 50],
            }
            .encode(),
            stray,
        ),
        data(2, vec![0x02; 10]),
    ]);
    let mut out = Vec::new();

    let n = fetch(&mut chan, well_known(), "s.bin", &mut out).unwrap();
    assert_eq!(n, 522);
    // The stray frame produced no ack.
    assert_eq!(chan.sent.len(), 3);
}

/// An inbound packet of an opcode the client never accepts is fatal.
#[test]
fn unexpected_opcode_is_fatal() {
    let mut chan = FakeChannel::new(vec![Event::Frame(encode_ack(1), reply_port())]);
    let mut out = Vec::new();

    let err = fetch(&mut chan, well_known(), "x.bin", &mut out).unwrap_err();
    assert_eq!(err, TftpError::UnexpectedOpcode(4));
    assert_eq!(err.exit_code(), 1);
}

/// A timeout mid-transfer re-sends the last ack, after which the transfer
/// resumes.
#[test]
fn mid_transfer_timeout_resends_last_ack() {
    let mut chan = FakeChannel::new(vec![
        data(1, vec![0x33; BLOCK_SIZE]),
        Event::Timeout,
        data(2, vec![0x44; 8]),
    ]);
    let mut out = Vec::new();

    let n = fetch(&mut chan, well_known(), "r.bin", &mut out).unwrap();
    assert_eq!(n, 520);

    // rrq, ack(1), re-sent ack(1), ack(2)
    let frames: Vec<&Vec<u8>> = chan.sent.iter().map(|(f, _)| f).collect();
    assert_eq!(
        frames,
        vec![
            &rrq("r.bin"),
            &encode_ack(1),
            &encode_ack(1),
            &encode_ack(2)
        ]
    );
}

// ---------------------------------------------------------------------------
// Real loopback exchange
// ---------------------------------------------------------------------------

/// Two-block transfer against a scripted server thread, with the reply
/// traffic coming from a fresh ephemeral port as a real server would.
#[test]
fn loopback_transfer() {
    use std::net::UdpSocket;
    use std::thread;

    let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
    let server_addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let mut buf = [0u8; 600];
        let (n, client) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(buf[..n].to_vec(), rrq("hello.txt"));

        // Reply from a transfer-specific ephemeral port.
        let tid = UdpSocket::bind("127.0.0.1:0").unwrap();

        let block1 = Packet::Data {
            block: 1,
            payload: vec![0xAB; BLOCK_SIZE],
        }
        .encode();
        tid.send_to(&block1, client).unwrap();
        let (n, _) = tid.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], &encode_ack(1)[..]);

        let block2 = Packet::Data {
            block: 2,
            payload: vec![0xCD; 40],
        }
        .encode();
        tid.send_to(&block2, client).unwrap();
        let (n, _) = tid.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], &encode_ack(2)[..]);
    });

    let mut channel = tftp_fetch::UdpChannel::bind().unwrap();
    let mut out = Vec::new();
    let n = fetch(&mut channel, server_addr, "hello.txt", &mut out).unwrap();

    assert_eq!(n, 552);
    assert_eq!(out.len(), 552);
    server.join().unwrap();
}
