//! Gate behaviour over file-backed stores, the way the CLI runs it
//!
//! Each "browser session" reopens the files from disk, so these tests cover
//! what actually survives a restart.

mod common;

use common::{HOUR_MS, PASSWORD, T0, USERNAME};
use medone_gate::clock::ManualClock;
use medone_gate::config::GateConfig;
use medone_gate::session::{DenyReason, GateDecision, SessionGate};
use medone_gate::storage::{FileStorage, StoragePort, StorageScope};
use medone_gate::types::{KEY_AUTHENTICATED, KEY_LOGIN_TIME, KEY_SESSION};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct Browser {
    tab: Arc<FileStorage>,
    durable: Arc<FileStorage>,
    gate: SessionGate,
}

fn open(dir: &Path, now_ms: i64) -> Browser {
    let tab = Arc::new(FileStorage::open(dir.join("tab.json")).unwrap());
    let durable = Arc::new(FileStorage::open(dir.join("durable.json")).unwrap());
    let gate = SessionGate::new(
        &GateConfig::default(),
        tab.clone(),
        durable.clone(),
        Arc::new(ManualClock::new(now_ms)),
    );
    Browser { tab, durable, gate }
}

#[test]
fn test_remembered_session_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let browser = open(dir.path(), T0);
        browser.gate.login(USERNAME, PASSWORD, true).unwrap();
        browser.tab.clear().unwrap();
    }

    let browser = open(dir.path(), T0 + HOUR_MS);
    assert!(browser.gate.check_authentication().is_granted());
    assert_eq!(
        browser.tab.get(KEY_LOGIN_TIME).unwrap(),
        Some(T0.to_string())
    );

    // The mirrored copy reached the file, not just the in-memory map.
    let again = open(dir.path(), T0 + HOUR_MS);
    assert_eq!(
        again.tab.get(KEY_AUTHENTICATED).unwrap().as_deref(),
        Some("true")
    );
}

#[test]
fn test_unremembered_session_does_not_survive_tab_close() {
    let dir = TempDir::new().unwrap();
    {
        let browser = open(dir.path(), T0);
        browser.gate.login(USERNAME, PASSWORD, false).unwrap();
        assert!(browser.durable.keys().unwrap().is_empty());
        browser.tab.clear().unwrap();
    }

    let browser = open(dir.path(), T0 + 1_000);
    assert!(matches!(
        browser.gate.check_authentication(),
        GateDecision::Denied {
            reason: DenyReason::Missing,
            ..
        }
    ));
}

#[test]
fn test_corrupt_durable_blob_on_disk_redirects() {
    let dir = TempDir::new().unwrap();
    {
        let browser = open(dir.path(), T0);
        browser.gate.login(USERNAME, PASSWORD, true).unwrap();
        browser.tab.clear().unwrap();
        browser.durable.set(KEY_SESSION, "medone_session=???").unwrap();
    }

    let browser = open(dir.path(), T0 + 1_000);
    assert!(!browser.gate.check_authentication().is_granted());
    assert!(browser.tab.keys().unwrap().is_empty());
}

#[test]
fn test_logout_wipes_files() {
    let dir = TempDir::new().unwrap();
    {
        let browser = open(dir.path(), T0);
        browser.gate.login(USERNAME, PASSWORD, true).unwrap();
        browser.gate.logout();
    }

    let browser = open(dir.path(), T0 + 1_000);
    assert!(browser.tab.keys().unwrap().is_empty());
    assert!(browser.durable.keys().unwrap().is_empty());
    assert!(!browser.gate.check_authentication().is_granted());
}

#[test]
fn test_logout_in_one_process_ends_session_for_watcher() {
    let dir = TempDir::new().unwrap();
    let cli = open(dir.path(), T0);
    let watcher = open(dir.path(), T0 + 1_000);

    cli.gate.login(USERNAME, PASSWORD, true).unwrap();
    assert!(watcher.gate.check_authentication().is_granted());

    cli.gate.logout();
    assert!(matches!(
        watcher.gate.check_authentication(),
        GateDecision::Denied {
            reason: DenyReason::Missing,
            ..
        }
    ));

    // The watcher's handles wrote nothing back over the logout.
    let after = open(dir.path(), T0 + 2_000);
    assert!(after.tab.keys().unwrap().is_empty());
    assert!(after.durable.keys().unwrap().is_empty());
}

#[test]
fn test_tab_close_from_another_process_falls_back_to_durable() {
    let dir = TempDir::new().unwrap();
    let cli = open(dir.path(), T0);
    let watcher = open(dir.path(), T0 + 1_000);

    cli.gate.login(USERNAME, PASSWORD, true).unwrap();
    assert!(watcher.gate.check_authentication().is_granted());
    cli.tab.clear().unwrap();

    match watcher.gate.check_authentication() {
        GateDecision::Granted(active) => assert_eq!(active.source, StorageScope::Durable),
        other => panic!("expected durable session to be used, got {:?}", other),
    }
}
