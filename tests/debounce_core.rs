// tests/debounce_core.rs
//
// Drives the pure manager core directly: timers are commands, fires are
// events, so the whole debounce behaviour is exercised without sleeping.

mod common;
use crate::common::{ConfigBuilder, ManualClock, init_tracing};

use std::sync::Arc;

use watchrun::engine::{
    ControlRequest, CoreCommand, ExecOutcome, ManagerCore, RuntimeEvent, RuntimeOptions,
};
use watchrun::exec::ExecutionResult;
use watchrun::time::Clock;
use watchrun::types::{ChangeKind, ExecutionStrategy, FileChangeEvent};

fn debounced_core() -> ManagerCore {
    let cfg = ConfigBuilder::new()
        .strategy(ExecutionStrategy::Debounced)
        .debounce_ms(300)
        .build();
    let clock: Arc<dyn Clock> = ManualClock::new();
    ManagerCore::new(&cfg, clock, RuntimeOptions::default())
}

fn modified(path: &str, content: &str) -> RuntimeEvent {
    RuntimeEvent::FileChanged(FileChangeEvent::new(
        path,
        ChangeKind::Modified,
        Some(content.to_string()),
    ))
}

fn deleted(path: &str) -> RuntimeEvent {
    RuntimeEvent::FileChanged(FileChangeEvent::new(path, ChangeKind::Deleted, None))
}

/// Extract the single armed debounce timer from a step's commands.
fn armed_timer(commands: &[CoreCommand]) -> (String, u64, u64) {
    match commands {
        [CoreCommand::ArmDebounceTimer(t)] => (t.path.clone(), t.seq, t.delay_ms),
        other => panic!("expected exactly one ArmDebounceTimer, got {other:?}"),
    }
}

fn success(duration_ms: u64) -> ExecutionResult {
    ExecutionResult {
        success: true,
        output: String::new(),
        error: None,
        duration_ms,
        timestamp: std::time::SystemTime::now(),
    }
}

#[test]
fn burst_collapses_to_one_execution_with_last_content() {
    init_tracing();
    let mut core = debounced_core();

    // "notes.txt" is deliberately unremarkable: importance 5, so the base
    // delay passes through unscaled.
    let step = core.step(modified("notes.txt", "one"));
    let (_, seq1, delay1) = armed_timer(&step.commands);
    assert_eq!(delay1, 300);

    let step = core.step(modified("notes.txt", "two"));
    let (_, seq2, _) = armed_timer(&step.commands);
    assert!(seq2 > seq1);

    let step = core.step(modified("notes.txt", "three"));
    let (_, seq3, _) = armed_timer(&step.commands);

    // The superseded timers fire into the void.
    for stale in [seq1, seq2] {
        let step = core.step(RuntimeEvent::DebounceFired {
            path: "notes.txt".to_string(),
            seq: stale,
        });
        assert!(step.commands.is_empty(), "stale fire must be ignored");
    }

    // Only the latest arm dispatches, carrying the last content.
    let step = core.step(RuntimeEvent::DebounceFired {
        path: "notes.txt".to_string(),
        seq: seq3,
    });
    match &step.commands[..] {
        [CoreCommand::Dispatch { entry, .. }] => {
            assert_eq!(entry.path, "notes.txt");
            assert_eq!(entry.content, "three");
        }
        other => panic!("expected Dispatch, got {other:?}"),
    }
    assert!(core.is_executing());
}

#[test]
fn high_churn_stretches_the_delay() {
    init_tracing();
    let mut core = debounced_core();

    // Ten prior changes plus the event itself puts the frequency at 11.
    for _ in 0..10 {
        core.metrics_mut().update_change_frequency("notes.txt");
    }

    let step = core.step(modified("notes.txt", "x"));
    let (_, _, delay) = armed_timer(&step.commands);
    assert_eq!(delay, 600);
}

#[test]
fn important_files_shrink_the_delay() {
    init_tracing();
    let mut core = debounced_core();

    // "src/main.py": +3 entry point, +1 source extension -> importance 9.
    let step = core.step(modified("src/main.py", "x"));
    let (_, _, delay) = armed_timer(&step.commands);
    assert_eq!(delay, 150);
}

#[test]
fn delay_clamps_at_floor_and_ceiling() {
    init_tracing();
    let mut core = debounced_core();

    core.step(RuntimeEvent::Control(ControlRequest::SetDebounceDelay(100)));
    let step = core.step(modified("src/main.py", "x"));
    let (_, _, delay) = armed_timer(&step.commands);
    assert_eq!(delay, 100, "importance-halved delay clamps to the floor");

    let mut core = debounced_core();
    core.step(RuntimeEvent::Control(ControlRequest::SetDebounceDelay(4000)));
    for _ in 0..12 {
        core.metrics_mut().update_change_frequency("notes.txt");
    }
    let step = core.step(modified("notes.txt", "x"));
    let (_, _, delay) = armed_timer(&step.commands);
    assert_eq!(delay, 5000, "churn-doubled delay clamps to the ceiling");
}

#[test]
fn deleting_a_file_drops_its_pending_work() {
    init_tracing();
    let mut core = debounced_core();

    let step = core.step(modified("notes.txt", "x"));
    let (_, seq, _) = armed_timer(&step.commands);

    let step = core.step(deleted("notes.txt"));
    assert!(step.commands.is_empty());

    let step = core.step(RuntimeEvent::DebounceFired {
        path: "notes.txt".to_string(),
        seq,
    });
    assert!(step.commands.is_empty(), "delete must cancel the timer");
    assert!(!core.is_executing());
}

#[test]
fn disable_clears_everything_and_ignores_changes() {
    init_tracing();
    let mut core = debounced_core();

    core.step(modified("a.txt", "x"));
    core.step(RuntimeEvent::Control(ControlRequest::Disable));
    assert!(!core.is_enabled());
    assert!(core.is_idle());

    let step = core.step(modified("b.txt", "x"));
    assert!(step.commands.is_empty(), "changes are ignored while disabled");

    core.step(RuntimeEvent::Control(ControlRequest::Toggle));
    assert!(core.is_enabled());
    let step = core.step(modified("b.txt", "x"));
    assert_eq!(step.commands.len(), 1);
}

#[test]
fn manual_execute_bypasses_debounce_and_single_flights() {
    init_tracing();
    let mut core = debounced_core();

    let step = core.step(RuntimeEvent::ManualExecute {
        path: "one.py".to_string(),
        content: "print(1)".to_string(),
    });
    let first_entry = match &step.commands[..] {
        [CoreCommand::Dispatch { entry, .. }] => entry.clone(),
        other => panic!("expected Dispatch, got {other:?}"),
    };

    // Second request while the first is in flight: queued, not dispatched.
    let step = core.step(RuntimeEvent::ManualExecute {
        path: "two.py".to_string(),
        content: "print(2)".to_string(),
    });
    assert!(step.commands.is_empty());
    assert_eq!(core.queue_status().queued_paths, vec!["two.py"]);

    // Completion of the first immediately dispatches the second.
    let step = core.step(RuntimeEvent::ExecutionFinished {
        entry: first_entry,
        outcome: ExecOutcome::Completed(success(7)),
    });
    match &step.commands[..] {
        [CoreCommand::Dispatch { entry, .. }] => assert_eq!(entry.path, "two.py"),
        other => panic!("expected Dispatch of the queued entry, got {other:?}"),
    }

    assert_eq!(core.metrics().total_executions(), 1);
    assert_eq!(core.metrics().user_interaction("one.py"), 1);
}

#[test]
fn failure_never_aborts_the_queue() {
    init_tracing();
    let mut core = debounced_core();

    core.step(RuntimeEvent::ManualExecute {
        path: "bad.py".to_string(),
        content: "boom".to_string(),
    });
    core.step(RuntimeEvent::ManualExecute {
        path: "good.py".to_string(),
        content: "ok".to_string(),
    });

    let in_flight = watchrun::engine::ExecutionQueueEntry::new("bad.py", "boom");
    let step = core.step(RuntimeEvent::ExecutionFinished {
        entry: in_flight,
        outcome: ExecOutcome::Infrastructure {
            error: "spawn failed".to_string(),
            duration_ms: 3,
        },
    });

    match &step.commands[..] {
        [CoreCommand::Dispatch { entry, .. }] => assert_eq!(entry.path, "good.py"),
        other => panic!("expected next Dispatch after failure, got {other:?}"),
    }
    assert_eq!(core.metrics().metrics().failed_executions, 1);
}
