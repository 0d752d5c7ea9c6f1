//! Configuration Tests
//!
//! Argument validation performed before any connection is made.

use ftlite::config::{validate_handle, validate_port, ServerConfig, DEFAULT_CHUNK_SIZE};
use ftlite::protocol::MAX_PAYLOAD_SIZE;
use ftlite::{ChatConfig, ClientConfig, FtError, Request};

fn get(name: &str) -> Request {
    Request::Get {
        filename: name.to_string(),
    }
}

#[test]
fn test_client_config_valid() {
    let config = ClientConfig::builder("localhost", 30021, Request::List, 30022)
        .download_dir("/tmp")
        .build()
        .unwrap();
    assert_eq!(config.server_port, 30021);
    assert_eq!(config.data_port, 30022);
}

#[test]
fn test_client_config_rejects_low_ports() {
    let err = ClientConfig::builder("localhost", 1023, Request::List, 30022)
        .build()
        .unwrap_err();
    assert!(matches!(err, FtError::Usage(_)));

    let err = ClientConfig::builder("localhost", 30021, Request::List, 80)
        .build()
        .unwrap_err();
    assert!(matches!(err, FtError::Usage(_)));
}

#[test]
fn test_client_config_rejects_matching_ports() {
    match ClientConfig::builder("localhost", 30021, Request::List, 30021).build() {
        Err(FtError::Usage(msg)) => assert!(msg.contains("cannot match")),
        other => panic!("Expected usage error, got {:?}", other),
    }
}

#[test]
fn test_client_config_rejects_empty_filename_and_host() {
    assert!(ClientConfig::builder("localhost", 30021, get(""), 30022).build().is_err());
    assert!(ClientConfig::builder("  ", 30021, Request::List, 30022).build().is_err());
}

#[test]
fn test_port_bounds() {
    assert!(validate_port(1024, "Port").is_ok());
    assert!(validate_port(65535, "Port").is_ok());
    assert!(validate_port(1023, "Port").is_err());
}

#[test]
fn test_server_config_defaults_and_clamping() {
    let config = ServerConfig::default();
    assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    assert_eq!(config.connect_attempts, 12);

    let config = ServerConfig::builder()
        .chunk_size(1_000_000)
        .connect_attempts(0)
        .build();
    assert_eq!(config.chunk_size, MAX_PAYLOAD_SIZE);
    assert_eq!(config.connect_attempts, 1);
}

#[test]
fn test_handles() {
    assert!(validate_handle("SteveO").is_ok());
    assert!(validate_handle("abcdefghij").is_ok());
    assert!(validate_handle("abcdefghijk").is_err());
    assert!(validate_handle("").is_err());
    assert!(validate_handle("two words").is_err());
    // Ten characters but twenty bytes
    assert!(validate_handle(&"é".repeat(10)).is_err());
    assert!(validate_handle(&"é".repeat(5)).is_ok());
    assert!(ChatConfig::new("Skyler").is_ok());
}
