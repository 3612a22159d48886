//! End-to-end tests over loopback TCP.
//!
//! These tests wrap real `TcpStream`s, exchange data through the traced
//! side, and verify the trace left in file and in-memory sinks as well as
//! deadline forwarding to socket timeouts.

use std::fs;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use conntrace::{ConnectionRegistry, RenderMode, SinkOptions, TimeFormat, TracedConnection};
use tempfile::tempdir;
use test_support::SharedBuffer;

fn pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (server, _) = listener.accept().unwrap();
    (client, server)
}

fn options() -> SinkOptions {
    SinkOptions::file().with_time_format(TimeFormat::parse("[hour]:[minute]:[second]").unwrap())
}

/// Verifies an echo exchange is traced to a file and a literal-mode buffer.
#[test]
fn echo_round_trip_is_traced() {
    let (client, mut server) = pair();
    let echo = thread::spawn(move || {
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        server.write_all(&buf).unwrap();
    });

    let dir = tempdir().unwrap();
    let path = dir.path().join("echo.log");
    let traced =
        TracedConnection::with_registry(client, Arc::new(ConnectionRegistry::new()));
    let file = traced.attach_file_with(&path, options());
    let literal = SharedBuffer::new();
    traced.attach_writer(literal.clone(), options().with_mode(RenderMode::SourceLiteral));

    (&traced).write_all(b"hello").unwrap();
    let mut reply = [0u8; 5];
    (&traced).read_exact(&mut reply).unwrap();
    echo.join().unwrap();
    traced.close().unwrap();

    assert_eq!(&reply, b"hello");
    assert!(file.is_closed());
    assert!(!file.has_error());

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("CONN[1] 68 65 6C 6C 6F "));
    assert!(text.contains("| hello"));
    assert!(text.contains("» Close()"));

    let source = literal.text();
    assert!(source.contains("let wbuf1: &[u8] = &[\n        0x68, 0x65, 0x6C, 0x6C, 0x6F,\n];\n"));
    assert!(source.contains("let rbuf1: &[u8] = &["));
    assert!(source.lines().filter(|l| l.contains('»')).all(|l| l.starts_with("// CONN[1] ")));
}

/// Verifies a past read deadline makes the next read time out.
#[test]
fn expired_read_deadline_times_out() {
    let (client, _server) = pair();
    let traced = TracedConnection::with_registry(client, Arc::new(ConnectionRegistry::new()));
    let out = SharedBuffer::new();
    traced.attach_writer(out.clone(), options());

    traced.set_read_deadline(Some(SystemTime::now() - Duration::from_secs(1))).unwrap();
    let mut buf = [0u8; 8];
    let err = traced.read(&mut buf).unwrap_err();
    assert!(
        matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut),
        "{err:?}"
    );

    traced.set_read_deadline(None).unwrap();
    assert_eq!(traced.get_ref().read_timeout().unwrap(), None);

    let text = out.text();
    assert!(text.contains("» SetReadDeadline("));
    assert!(text.contains("» SetReadDeadline(none)"));
    assert!(text.contains("« Read() returned Err("));
}

/// Verifies traced addresses match the underlying socket's.
#[test]
fn addresses_match_socket() {
    let (client, server) = pair();
    let expected_local = client.local_addr().unwrap();
    let traced = TracedConnection::with_registry(client, Arc::new(ConnectionRegistry::new()));
    traced.attach_writer(Vec::new(), options());

    assert_eq!(traced.local_addr().unwrap(), expected_local);
    assert_eq!(traced.peer_addr().unwrap(), server.local_addr().unwrap());
}

/// Verifies a peer that closes mid-conversation surfaces as EOF, untouched.
#[test]
fn peer_shutdown_reads_as_eof() {
    let (client, server) = pair();
    drop(server);
    let traced = TracedConnection::with_registry(client, Arc::new(ConnectionRegistry::new()));
    let sink = traced.attach_writer(Vec::new(), options());

    let mut buf = [0u8; 4];
    assert_eq!(traced.read(&mut buf).unwrap(), 0);
    assert_eq!(sink.received_dumps(), 1);
}
