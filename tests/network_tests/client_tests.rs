//! Client Tests
//!
//! Run the client against scripted servers that speak the protocol by hand.

use std::fs;
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ftlite::network::send_listing;
use ftlite::protocol::{read_packet, write_packet, Packet, Tag};
use ftlite::{Client, ClientConfig, DataOutcome, FtError, Request};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Accept one control connection and hand it to `script`
fn scripted_server<F>(script: F) -> (u16, JoinHandle<()>)
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        script(stream);
    });
    (port, handle)
}

/// Read DPORT and the command, returning the announced port and command packet
fn read_preamble(control: &mut TcpStream) -> (u16, Packet) {
    let dport = read_packet(control).unwrap();
    assert_eq!(dport.tag, Tag::Dport);
    let port = dport.text().parse().unwrap();
    let command = read_packet(control).unwrap();
    (port, command)
}

fn client(server_port: u16, request: Request, download_dir: &TempDir) -> Client {
    let config = ClientConfig::builder("127.0.0.1", server_port, request, free_port())
        .download_dir(download_dir.path())
        .accept_timeout_ms(2_000)
        .read_timeout_ms(5_000)
        .build()
        .unwrap();
    Client::new(config)
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_server_error_is_surfaced_and_data_phase_skipped() {
    let (port, server) = scripted_server(|mut control| {
        let (_, command) = read_preamble(&mut control);
        assert_eq!(command.tag, Tag::Get);
        assert_eq!(command.text(), "missing.txt");
        write_packet(&mut control, &Packet::error("File not found")).unwrap();
    });

    let dir = TempDir::new().unwrap();
    let request = Request::Get {
        filename: "missing.txt".to_string(),
    };
    match client(port, request, &dir).run() {
        Err(FtError::Server(msg)) => assert_eq!(msg, "File not found"),
        other => panic!("Expected server error, got {:?}", other),
    }
    server.join().unwrap();
}

#[test]
fn test_listing_with_ack_on_control() {
    let (port, server) = scripted_server(|mut control| {
        let (data_port, command) = read_preamble(&mut control);
        assert_eq!(command.tag, Tag::List);
        write_packet(&mut control, &Packet::empty(Tag::Ack)).unwrap();

        let mut data = TcpStream::connect(("127.0.0.1", data_port)).unwrap();
        send_listing(&mut data, vec!["one".to_string(), "two".to_string()]).unwrap();
        write_packet(&mut control, &Packet::empty(Tag::Close)).unwrap();

        // The acknowledgement arrives on the control connection
        assert_eq!(read_packet(&mut control).unwrap().tag, Tag::Ack);
    });

    let dir = TempDir::new().unwrap();
    let outcome = client(port, Request::List, &dir).run().unwrap();
    assert_eq!(
        outcome,
        DataOutcome::Listing(vec!["one".to_string(), "two".to_string()])
    );
    server.join().unwrap();
}

#[test]
fn test_queued_error_before_close_fails_the_run() {
    let (port, server) = scripted_server(|mut control| {
        let (data_port, _) = read_preamble(&mut control);
        write_packet(&mut control, &Packet::empty(Tag::Ack)).unwrap();

        let mut data = TcpStream::connect(("127.0.0.1", data_port)).unwrap();
        send_listing(&mut data, Vec::new()).unwrap();
        write_packet(&mut control, &Packet::error("disk on fire")).unwrap();
        write_packet(&mut control, &Packet::empty(Tag::Close)).unwrap();
        assert_eq!(read_packet(&mut control).unwrap().tag, Tag::Ack);
    });

    let dir = TempDir::new().unwrap();
    match client(port, Request::List, &dir).run() {
        Err(FtError::Server(msg)) => assert!(msg.contains("disk on fire")),
        other => panic!("Expected server error, got {:?}", other),
    }
    server.join().unwrap();
}

#[test]
fn test_unexpected_reply_is_protocol_error() {
    let (port, server) = scripted_server(|mut control| {
        read_preamble(&mut control);
        write_packet(&mut control, &Packet::empty(Tag::Done)).unwrap();
    });

    let dir = TempDir::new().unwrap();
    assert!(matches!(
        client(port, Request::List, &dir).run(),
        Err(FtError::Protocol(_))
    ));
    server.join().unwrap();
}

#[test]
fn test_file_exists_still_acknowledges() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dup.txt"), b"mine").unwrap();

    let (port, server) = scripted_server(|mut control| {
        let (data_port, _) = read_preamble(&mut control);
        write_packet(&mut control, &Packet::empty(Tag::Ack)).unwrap();

        let mut data = TcpStream::connect(("127.0.0.1", data_port)).unwrap();
        write_packet(&mut data, &Packet::new(Tag::File, "dup.txt")).unwrap();
        write_packet(&mut data, &Packet::new(Tag::Chunk, "theirs")).unwrap();
        write_packet(&mut data, &Packet::empty(Tag::Done)).unwrap();
        write_packet(&mut control, &Packet::empty(Tag::Close)).unwrap();
        assert_eq!(read_packet(&mut control).unwrap().tag, Tag::Ack);
    });

    let request = Request::Get {
        filename: "dup.txt".to_string(),
    };
    match client(port, request, &dir).run() {
        Err(FtError::FileExists(path)) => assert_eq!(path, dir.path().join("dup.txt")),
        other => panic!("Expected FileExists, got {:?}", other),
    }
    assert_eq!(fs::read(dir.path().join("dup.txt")).unwrap(), b"mine");
    server.join().unwrap();
}

#[test]
fn test_data_connection_never_arrives() {
    let (port, server) = scripted_server(|mut control| {
        read_preamble(&mut control);
        write_packet(&mut control, &Packet::empty(Tag::Ack)).unwrap();
        // Hold the control connection open past the client's accept deadline
        thread::sleep(Duration::from_millis(2_500));
    });

    let dir = TempDir::new().unwrap();
    assert!(matches!(
        client(port, Request::List, &dir).run(),
        Err(FtError::Timeout(_))
    ));
    server.join().unwrap();
}

#[test]
fn test_unreachable_server_is_connection_error() {
    let dir = TempDir::new().unwrap();
    let port = free_port();
    assert!(matches!(
        client(port, Request::List, &dir).run(),
        Err(FtError::Connection(_))
    ));
}
