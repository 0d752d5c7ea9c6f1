//! Chat Tests
//!
//! Turn-taking, rendering and termination of the chat relay.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use ftlite::chat::{
    converse, ChatEnd, ChatEvent, ChatServer, ChatSession, LineSource, Turn, MAX_MESSAGE_LEN,
    MAX_WIRE_LEN, QUIT,
};
use ftlite::{ChatConfig, FtError, Result};

// =============================================================================
// Helper Functions
// =============================================================================

/// Pre-recorded user input
struct Script(VecDeque<String>);

impl Script {
    fn new(lines: &[&str]) -> Self {
        Script(lines.iter().map(|l| l.to_string()).collect())
    }
}

impl LineSource for Script {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.0.pop_front())
    }
}

fn socket_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (server, _) = listener.accept().unwrap();
    client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    server.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    (client, server)
}

fn config(handle: &str) -> ChatConfig {
    ChatConfig::new(handle).unwrap()
}

// =============================================================================
// Session Tests
// =============================================================================

#[test]
fn test_send_prepends_handle() {
    let (a, mut b) = socket_pair();
    let mut session = ChatSession::new(a, config("SteveO"));
    session.send("Hi!!!").unwrap();

    let mut buf = [0u8; 64];
    let n = b.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"SteveO > Hi!!!");
}

#[test]
fn test_quit_is_sent_bare() {
    let (a, b) = socket_pair();
    let mut sender = ChatSession::new(a, config("SteveO"));
    let mut receiver = ChatSession::new(b, config("host"));
    sender.send(QUIT).unwrap();
    assert_eq!(receiver.recv().unwrap(), ChatEvent::Quit);
}

#[test]
fn test_oversized_message_rejected_without_sending() {
    let (a, _b) = socket_pair();
    let mut session = ChatSession::new(a, config("me"));
    let long = "x".repeat(MAX_MESSAGE_LEN + 1);
    assert!(matches!(session.send(&long), Err(FtError::Usage(_))));
    assert!(session.send(&"y".repeat(MAX_MESSAGE_LEN)).is_ok());
}

#[test]
fn test_multibyte_handle_limited_by_bytes() {
    assert!(ChatConfig::new("é".repeat(5)).is_ok());
    assert!(matches!(ChatConfig::new("é".repeat(10)), Err(FtError::Usage(_))));
}

#[test]
fn test_longest_message_from_multibyte_handle_arrives_whole() {
    let (a, b) = socket_pair();
    let handle = "é".repeat(5);
    let mut sender = ChatSession::new(a, config(&handle));
    let mut receiver = ChatSession::new(b, config("host"));

    let text = "x".repeat(MAX_MESSAGE_LEN);
    sender.send(&text).unwrap();

    let expected = format!("{} > {}", handle, text);
    assert_eq!(expected.len(), MAX_WIRE_LEN);
    assert_eq!(receiver.recv().unwrap(), ChatEvent::Message(expected));
}

#[test]
fn test_unvalidated_handle_cannot_overflow_wire_limit() {
    let (a, _b) = socket_pair();
    let wide = ChatConfig {
        handle: "é".repeat(10),
    };
    let mut session = ChatSession::new(a, wide);
    let text = "x".repeat(MAX_MESSAGE_LEN);
    assert!(matches!(session.send(&text), Err(FtError::Usage(_))));
    assert!(session.send("short").is_ok());
}

#[test]
fn test_recv_reports_closed_peer() {
    let (a, b) = socket_pair();
    let mut session = ChatSession::new(a, config("me"));
    drop(b);
    assert_eq!(session.recv().unwrap(), ChatEvent::Closed);
}

// =============================================================================
// Conversation Tests
// =============================================================================

#[test]
fn test_conversation_until_local_quit() {
    let (a, mut b) = socket_pair();

    let peer = thread::spawn(move || {
        let mut buf = [0u8; 600];
        let n = b.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"alice > hello");
        b.write_all(b"bob > hey").unwrap();
        let n = b.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"quit");
    });

    let mut session = ChatSession::new(a, config("alice"));
    let mut input = Script::new(&["hello", "quit"]);
    let mut seen = Vec::new();
    let end = converse(&mut session, &mut input, Turn::Local, |m| seen.push(m.to_string())).unwrap();

    assert_eq!(end, ChatEnd::LocalQuit);
    assert_eq!(seen, vec!["bob > hey"]);
    peer.join().unwrap();
}

#[test]
fn test_conversation_until_peer_quit() {
    let (a, mut b) = socket_pair();

    let peer = thread::spawn(move || {
        b.write_all(b"bob > first").unwrap();
        let mut buf = [0u8; 600];
        let n = b.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"host > reply");
        b.write_all(b"quit").unwrap();
    });

    let mut session = ChatSession::new(a, config("host"));
    let mut input = Script::new(&["reply"]);
    let end = converse(&mut session, &mut input, Turn::Remote, |_| {}).unwrap();
    assert_eq!(end, ChatEnd::PeerQuit);
    peer.join().unwrap();
}

#[test]
fn test_end_of_input_counts_as_quit() {
    let (a, mut b) = socket_pair();
    let mut session = ChatSession::new(a, config("me"));
    let mut input = Script::new(&[]);
    let end = converse(&mut session, &mut input, Turn::Local, |_| {}).unwrap();
    assert_eq!(end, ChatEnd::LocalQuit);

    let mut buf = [0u8; 16];
    let n = b.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"quit");
}

#[test]
fn test_too_long_line_is_reprompted() {
    let (a, mut b) = socket_pair();
    let long = "z".repeat(MAX_MESSAGE_LEN + 10);
    let mut session = ChatSession::new(a, config("me"));
    let mut input = Script(VecDeque::from(vec![long, "short".to_string(), "quit".to_string()]));

    let peer = thread::spawn(move || {
        let mut buf = [0u8; 600];
        let n = b.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"me > short");
        b.write_all(b"ok").unwrap();
        let n = b.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"quit");
    });

    let end = converse(&mut session, &mut input, Turn::Local, |_| {}).unwrap();
    assert_eq!(end, ChatEnd::LocalQuit);
    peer.join().unwrap();
}

// =============================================================================
// Server Tests
// =============================================================================

#[test]
fn test_chat_server_returns_to_accepting_then_stops_on_local_quit() {
    let server = ChatServer::bind("127.0.0.1:0", config("serve")).unwrap();
    let addr = server.local_addr().unwrap();

    let runner = thread::spawn(move || {
        // First peer quits; second peer gets a local quit
        let mut input = Script::new(&["welcome", "quit"]);
        let mut seen = Vec::new();
        server.run(&mut input, |m| seen.push(m.to_string())).unwrap();
        seen
    });

    let mut first = ChatSession::connect(addr, config("one")).unwrap();
    first.send("hi").unwrap();
    assert_eq!(first.recv().unwrap(), ChatEvent::Message("serve > welcome".to_string()));
    first.send(QUIT).unwrap();
    drop(first);

    let mut second = ChatSession::connect(addr, config("two")).unwrap();
    second.send("anyone?").unwrap();
    assert_eq!(second.recv().unwrap(), ChatEvent::Quit);

    let seen = runner.join().unwrap();
    assert_eq!(seen, vec!["one > hi", "two > anyone?"]);
}
