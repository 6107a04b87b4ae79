// tests/watcher.rs

mod common;
use crate::common::init_tracing;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use watchrun::config::WatchSection;
use watchrun::engine::RuntimeEvent;
use watchrun::types::ChangeKind;
use watchrun::watch::{WatchProfile, spawn_watcher};

fn py_only_profile() -> WatchProfile {
    let section = WatchSection {
        include: vec!["**/*.py".to_string()],
        ..WatchSection::default()
    };
    WatchProfile::from_config(&section).expect("valid profile")
}

/// Pull the next FileChanged event, failing the test after `secs` seconds.
async fn next_change(
    rx: &mut mpsc::Receiver<RuntimeEvent>,
    secs: u64,
) -> watchrun::types::FileChangeEvent {
    loop {
        let event = timeout(Duration::from_secs(secs), rx.recv())
            .await
            .expect("timed out waiting for a change event")
            .expect("watcher channel closed");
        if let RuntimeEvent::FileChanged(change) = event {
            return change;
        }
    }
}

#[test]
fn profile_matches_includes_and_excludes() {
    let section = WatchSection {
        include: vec!["src/**/*.py".to_string()],
        exclude: vec!["src/**/ignored/**".to_string()],
        ..WatchSection::default()
    };
    let profile = WatchProfile::from_config(&section).expect("valid profile");

    assert!(profile.matches("src/app/run.py"));
    assert!(!profile.matches("src/app/run.ts"));
    assert!(!profile.matches("src/app/ignored/run.py"));

    // Empty include means "everything not excluded".
    let open = WatchProfile::from_config(&WatchSection {
        include: vec![],
        exclude: vec!["**/*.log".to_string()],
        ..WatchSection::default()
    })
    .expect("valid profile");
    assert!(open.matches("anything/at/all.rs"));
    assert!(!open.matches("noisy/debug.log"));
}

#[tokio::test]
async fn watcher_forwards_matching_changes_with_content() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(64);

    let _handle = spawn_watcher(dir.path(), py_only_profile(), tx, true).expect("watcher");

    // Give the OS watcher a moment to become effective.
    tokio::time::sleep(Duration::from_millis(300)).await;

    std::fs::write(dir.path().join("hello.py"), "print('hello')").expect("write");
    // A non-matching neighbour must never surface.
    std::fs::write(dir.path().join("hello.txt"), "nope").expect("write");

    let change = next_change(&mut rx, 5).await;
    assert_eq!(change.path, "hello.py");
    assert!(matches!(
        change.kind,
        ChangeKind::Created | ChangeKind::Modified
    ));
    assert_eq!(change.content.as_deref(), Some("print('hello')"));

    // Drain any duplicate notifications for the same write.
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(500), rx.recv()).await
    {
        if let RuntimeEvent::FileChanged(change) = event {
            assert_eq!(change.path, "hello.py", "only matching paths surface");
        }
    }
}

#[tokio::test]
async fn unchanged_content_is_suppressed() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(64);

    let _handle = spawn_watcher(dir.path(), py_only_profile(), tx, true).expect("watcher");
    tokio::time::sleep(Duration::from_millis(300)).await;

    std::fs::write(dir.path().join("same.py"), "print(1)").expect("write");
    let change = next_change(&mut rx, 5).await;
    assert_eq!(change.path, "same.py");

    // Let the notification burst from the first write settle.
    while tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .is_ok()
    {}

    // Rewriting identical bytes must not produce a new event.
    std::fs::write(dir.path().join("same.py"), "print(1)").expect("write");
    let quiet = tokio::time::timeout(Duration::from_millis(700), rx.recv()).await;
    assert!(quiet.is_err(), "identical content must be suppressed");
}
