//! End-to-end tests against a real HTTP server.
//!
//! Run with: `cargo test --test http_end_to_end`

use std::fs;
use std::time::Duration;

use httpmock::prelude::*;
use tempfile::TempDir;

use patchsync::events::{self, SyncEvent};
use patchsync::{RunState, SyncConfig, SyncEngine, SyncMode};

/// SHA-1 of the bytes 0x01 0x02 0x03.
const SHA1_123: &str = "7037807198c22a7d2b0807371d763779a84fdfcf";

/// SHA-1 of "hello world".
const SHA1_HELLO: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

#[test]
fn test_full_check_over_http() {
    let server = MockServer::start();
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("system")).unwrap();
    fs::write(temp.path().join("system/l2.ini"), b"hello world").unwrap();

    let manifest = format!(
        r#"{{
            "base_url": "{}",
            "files": [
                {{ "path": "system/l2.ini", "sha1": "{}", "size": 11 }},
                {{ "path": "data/a.bin", "sha1": "{}", "size": 3 }}
            ]
        }}"#,
        server.url("/client/"),
        SHA1_HELLO,
        SHA1_123
    );

    let manifest_mock = server.mock(|when, then| {
        when.method(GET).path("/l2updater/fullcheck.json");
        then.status(200)
            .header("content-type", "application/json")
            .body(manifest.clone());
    });
    let file_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/client/data/a.bin")
            .header_exists("user-agent");
        then.status(200).body([1u8, 2, 3]);
    });
    let unchanged_mock = server.mock(|when, then| {
        when.method(GET).path("/client/system/l2.ini");
        then.status(200).body("hello world");
    });

    let config = SyncConfig::new(temp.path())
        .with_fullcheck_manifest(server.url("/l2updater/fullcheck.json"));
    let engine = SyncEngine::new(config).unwrap();
    let mut handle = engine.start(SyncMode::FullCheck).unwrap();
    let receiver = handle.take_events().unwrap();
    let outcome = handle.wait().unwrap();
    let events = events::drain(receiver);

    assert!(outcome.is_success(), "{:?}", outcome);
    assert_eq!(fs::read(temp.path().join("data/a.bin")).unwrap(), vec![1, 2, 3]);
    assert_eq!(outcome.downloaded_count, 1);
    manifest_mock.assert();
    file_mock.assert();
    unchanged_mock.assert_hits(0);
    assert_eq!(events.last(), Some(&SyncEvent::RunFinished(true)));
}

#[test]
fn test_manifest_not_found_over_http() {
    let server = MockServer::start();
    let temp = TempDir::new().unwrap();
    server.mock(|when, then| {
        when.method(GET).path("/update.json");
        then.status(404);
    });

    let config = SyncConfig::new(temp.path()).with_update_manifest(server.url("/update.json"));
    let outcome = SyncEngine::new(config)
        .unwrap()
        .start(SyncMode::Update)
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(outcome.state, RunState::Failed);
    assert!(outcome.error.unwrap().contains("status 404"));
}

#[test]
fn test_invalid_manifest_body_over_http() {
    let server = MockServer::start();
    let temp = TempDir::new().unwrap();
    server.mock(|when, then| {
        when.method(GET).path("/update.json");
        then.status(200).body(r#"{"base_url":"x"}"#);
    });

    let config = SyncConfig::new(temp.path()).with_update_manifest(server.url("/update.json"));
    let outcome = SyncEngine::new(config)
        .unwrap()
        .start(SyncMode::Update)
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(outcome.state, RunState::Failed);
    assert!(outcome.error.unwrap().contains("invalid manifest document"));
}

#[test]
fn test_slow_manifest_times_out() {
    let server = MockServer::start();
    let temp = TempDir::new().unwrap();
    server.mock(|when, then| {
        when.method(GET).path("/update.json");
        then.status(200)
            .delay(Duration::from_secs(3))
            .body(r#"{"files":[]}"#);
    });

    let config = SyncConfig::new(temp.path())
        .with_update_manifest(server.url("/update.json"))
        .with_manifest_timeout(Duration::from_secs(1));
    let engine = SyncEngine::new(config).unwrap();
    let mut handle = engine.start(SyncMode::Update).unwrap();
    let receiver = handle.take_events().unwrap();
    let outcome = handle.wait().unwrap();

    assert_eq!(outcome.state, RunState::Failed);
    assert!(outcome.error.unwrap().contains("timed out after 1s"));
    assert!(!events::drain(receiver)
        .iter()
        .any(|e| matches!(e, SyncEvent::ProgressChanged(_))));
}
