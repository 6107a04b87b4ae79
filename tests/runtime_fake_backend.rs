// tests/runtime_fake_backend.rs
//
// End-to-end through the async shell with real timers and a fake backend.

mod common;
use crate::common::{ConfigBuilder, FakeBackend, init_tracing, wait_until};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use watchrun::engine::{ManagerCore, ManagerHandle, Runtime, RuntimeEvent, RuntimeOptions};
use watchrun::time::system_clock;
use watchrun::types::{ChangeKind, ExecutionStrategy, FileChangeEvent};

fn spawn_runtime(
    cfg: watchrun::config::ConfigFile,
) -> (
    ManagerHandle,
    Arc<Mutex<Vec<watchrun::exec::ExecutionRequest>>>,
    tokio::task::JoinHandle<watchrun::errors::Result<()>>,
) {
    let core = ManagerCore::new(&cfg, system_clock(), RuntimeOptions::default());

    let executed = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeBackend::new(Arc::clone(&executed));

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let handle = ManagerHandle::new(rt_tx.clone());
    let runtime = Runtime::new(core, rt_rx, rt_tx, backend, 30_000);
    let task = tokio::spawn(runtime.run());

    (handle, executed, task)
}

#[tokio::test]
async fn debounced_burst_runs_once_with_the_last_content() {
    init_tracing();

    let cfg = ConfigBuilder::new()
        .strategy(ExecutionStrategy::Debounced)
        .debounce_ms(150)
        .build();
    let (handle, executed, runtime_task) = spawn_runtime(cfg);

    // A burst of edits well inside the 150ms window.
    for content in ["one", "two", "three"] {
        handle
            .handle_file_change(FileChangeEvent::new(
                "notes.txt",
                ChangeKind::Modified,
                Some(content.to_string()),
            ))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    {
        let executed = Arc::clone(&executed);
        wait_until("debounced execution", move || {
            !executed.lock().unwrap().is_empty()
        })
        .await;
    }

    // The window has long passed; nothing else may arrive.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let executed = executed.lock().unwrap();
    assert_eq!(executed.len(), 1, "burst must collapse to one run");
    assert_eq!(executed[0].filename, "notes.txt");
    assert_eq!(executed[0].code, "three");

    drop(executed);
    handle.shutdown().await.unwrap();
    runtime_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn immediate_strategy_skips_the_timers() {
    init_tracing();

    let cfg = ConfigBuilder::new()
        .strategy(ExecutionStrategy::Immediate)
        .build();
    let (handle, executed, runtime_task) = spawn_runtime(cfg);

    handle
        .handle_file_change(FileChangeEvent::new(
            "run.py",
            ChangeKind::Modified,
            Some("print('hi')".to_string()),
        ))
        .await
        .unwrap();

    {
        let executed = Arc::clone(&executed);
        wait_until("immediate execution", move || {
            executed.lock().unwrap().len() == 1
        })
        .await;
    }

    handle.shutdown().await.unwrap();
    runtime_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn batched_files_flush_together_after_the_window() {
    init_tracing();

    let cfg = ConfigBuilder::new()
        .strategy(ExecutionStrategy::Batched)
        .batch_window_ms(120)
        .build();
    let (handle, executed, runtime_task) = spawn_runtime(cfg);

    for path in ["src/a/x.py", "src/a/y.py"] {
        handle
            .handle_file_change(FileChangeEvent::new(
                path,
                ChangeKind::Modified,
                Some("pass".to_string()),
            ))
            .await
            .unwrap();
    }

    {
        let executed = Arc::clone(&executed);
        wait_until("batch to flush and run", move || {
            executed.lock().unwrap().len() == 2
        })
        .await;
    }

    let executed = executed.lock().unwrap();
    assert_eq!(executed[0].filename, "src/a/x.py");
    assert_eq!(executed[1].filename, "src/a/y.py");

    drop(executed);
    handle.shutdown().await.unwrap();
    runtime_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn failures_are_recorded_and_do_not_stop_the_queue() {
    init_tracing();

    let cfg = ConfigBuilder::new().build();
    let core = ManagerCore::new(&cfg, system_clock(), RuntimeOptions::default());

    let executed = Arc::new(Mutex::new(Vec::new()));
    let backend = FakeBackend::new(Arc::clone(&executed));
    backend.push_result(FakeBackend::failure(8, "exit code 1"));

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let handle = ManagerHandle::new(rt_tx.clone());
    let runtime = Runtime::new(core, rt_rx, rt_tx, backend, 30_000);
    let runtime_task = tokio::spawn(runtime.run());

    handle
        .execute_now("bad.py", Some("boom".to_string()))
        .await
        .unwrap();
    handle
        .execute_now("good.py", Some("print('ok')".to_string()))
        .await
        .unwrap();

    {
        let executed = Arc::clone(&executed);
        wait_until("both entries to run", move || {
            executed.lock().unwrap().len() == 2
        })
        .await;
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let status = handle.execution_status().await.unwrap();
        if status.execution_count == 2 {
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("failure and success were never both recorded");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    handle.shutdown().await.unwrap();
    runtime_task.await.unwrap().unwrap();
}
