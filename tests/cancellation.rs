// tests/cancellation.rs

mod common;
use crate::common::{ConfigBuilder, FakeBackend, init_tracing, wait_until};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use watchrun::cancel::CancellationToken;
use watchrun::engine::{ManagerCore, ManagerHandle, Runtime, RuntimeEvent, RuntimeOptions};
use watchrun::time::system_clock;

#[test]
fn late_subscriber_fires_synchronously() {
    let token = CancellationToken::new();
    token.cancel();

    let fired = Arc::new(AtomicU32::new(0));
    let observed = Arc::clone(&fired);
    token.on_cancelled(move || {
        observed.fetch_add(1, Ordering::SeqCst);
    });

    // The callback ran before on_cancelled returned; no polling needed.
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn cancel_is_idempotent_and_fires_callbacks_once() {
    let token = CancellationToken::new();
    let fired = Arc::new(AtomicU32::new(0));

    let observed = Arc::clone(&fired);
    token.on_cancelled(move || {
        observed.fetch_add(1, Ordering::SeqCst);
    });

    assert!(!token.is_cancelled());
    token.cancel();
    token.cancel();
    token.cancel();

    assert!(token.is_cancelled());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn clones_share_cancellation_state() {
    let token = CancellationToken::new();
    let clone = token.clone();

    clone.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn callbacks_may_register_further_callbacks() {
    let token = CancellationToken::new();
    let fired = Arc::new(AtomicU32::new(0));

    let outer_token = token.clone();
    let outer_fired = Arc::clone(&fired);
    token.on_cancelled(move || {
        let inner_fired = Arc::clone(&outer_fired);
        // Registered mid-cancellation: the token is already cancelled, so
        // this runs immediately.
        outer_token.on_cancelled(move || {
            inner_fired.fetch_add(10, Ordering::SeqCst);
        });
        outer_fired.fetch_add(1, Ordering::SeqCst);
    });

    token.cancel();
    assert_eq!(fired.load(Ordering::SeqCst), 11);
}

/// Cancelling an in-flight execution is advisory: the backend is asked to
/// stop, the run resolves through its normal completion path, and the queue
/// moves on.
#[tokio::test]
async fn cancel_during_execution_is_cooperative() {
    init_tracing();

    let cfg = ConfigBuilder::new().build();
    let core = ManagerCore::new(&cfg, system_clock(), RuntimeOptions::default());

    let executed = Arc::new(Mutex::new(Vec::new()));
    let (backend, _gate) = FakeBackend::gated(Arc::clone(&executed));
    backend.push_result(FakeBackend::failure(12, "execution cancelled"));
    let cancel_counter = backend.cancel_counter();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let handle = ManagerHandle::new(rt_tx.clone());
    let runtime = Runtime::new(core, rt_rx, rt_tx, backend, 30_000);
    let runtime_task = tokio::spawn(runtime.run());

    handle
        .execute_now("slow.py", Some("while True: pass".to_string()))
        .await
        .unwrap();
    handle
        .execute_now("next.py", Some("print('next')".to_string()))
        .await
        .unwrap();

    {
        let executed = Arc::clone(&executed);
        wait_until("first execution to start", move || {
            executed.lock().unwrap().len() == 1
        })
        .await;
    }

    // Cancel: the fake backend counts the call and releases its gate, so
    // the in-flight run resolves (with the scripted "cancelled" failure).
    handle.cancel_execution().await.unwrap();

    {
        let cancel_counter = Arc::clone(&cancel_counter);
        wait_until("backend to observe cancellation", move || {
            *cancel_counter.lock().unwrap() == 1
        })
        .await;
    }

    // The queue was not aborted: the next entry still runs.
    {
        let executed = Arc::clone(&executed);
        wait_until("second execution to start", move || {
            executed.lock().unwrap().len() == 2
        })
        .await;
    }

    let status = handle.execution_status().await.unwrap();
    assert_eq!(status.execution_count, 1, "cancelled run recorded once");

    handle.shutdown().await.unwrap();
    runtime_task.await.unwrap().unwrap();
}
