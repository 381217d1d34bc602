use schedsim::*;

mod common;

/// Worker B (burst 1) is dispatched before worker A (burst 3).
#[test]
fn test_shortest_burst_runs_first() {
    common::setup_test();
    let config = common::scripted(
        PolicyKind::Srtf,
        1,
        &[WorkerScript::finish_after(3), WorkerScript::finish_after(1)],
    );
    let result = common::run(config);

    assert_eq!(result.trace.first_dispatch(WorkerId(1)), Some(1));
    assert_eq!(result.trace.first_dispatch(WorkerId(0)), Some(2));
    // A is re-selected after each of its ticks.
    assert_eq!(result.trace.dispatch_order(), common::ids(&[1, 0, 0, 0]));
    assert_eq!(result.ticks(), 5);
}

/// Same ordering when B goes to I/O instead of finishing.
#[test]
fn test_shortest_burst_first_with_io() {
    common::setup_test();
    let config = common::scripted(
        PolicyKind::Srtf,
        1,
        &[
            WorkerScript::finish_after(3),
            WorkerScript::finish_after(1).then(ScriptStep::Io(1)),
        ],
    );
    let result = common::run(config);

    let order = result.trace.dispatch_order();
    assert_eq!(&order[..2], &common::ids(&[1, 0])[..]);
    assert!(result.trace.events().iter().any(|e| matches!(
        e.kind,
        TraceKind::IoRequested { worker, next_burst: Some(1), .. } if worker == WorkerId(1)
    )));
}

/// Equal remaining bursts resolve to the lowest index, every time.
#[test]
fn test_tie_break_lowest_index() {
    common::setup_test();
    let config = common::scripted(
        PolicyKind::Srtf,
        1,
        &[
            WorkerScript::finish_after(2),
            WorkerScript::finish_after(2),
            WorkerScript::finish_after(2),
        ],
    );
    let result = common::run(config);
    assert_eq!(
        result.trace.dispatch_order(),
        common::ids(&[0, 0, 1, 1, 2, 2])
    );
}

/// A worker coming back from I/O with a shorter burst takes the CPU on
/// the first selection after it wakes.
#[test]
fn test_short_burst_after_io_preempts() {
    common::setup_test();
    let config = common::scripted(
        PolicyKind::Srtf,
        1,
        &[
            WorkerScript::finish_after(8),
            WorkerScript::finish_after(1).then(ScriptStep::Io(1)),
        ],
    );
    let result = common::run(config);
    let trace = &result.trace;

    let woke = common::ticks_where(trace, |k| {
        matches!(k, TraceKind::IoCompleted { worker } if *worker == WorkerId(1))
    });
    assert_eq!(woke.len(), 1);

    let next_dispatch = trace
        .events()
        .iter()
        .filter(|e| e.tick >= woke[0])
        .find_map(|e| match e.kind {
            TraceKind::Dispatched { worker, .. } => Some(worker),
            _ => None,
        });
    assert_eq!(next_dispatch, Some(WorkerId(1)));
}

/// Every executed tick hands the CPU back, so `Ran` never keeps a worker
/// running under SRTF.
#[test]
fn test_every_tick_reselects() {
    common::setup_test();
    let result = common::run(common::inline(PolicyKind::Srtf).seed(52).build());
    for e in result.trace.events() {
        if let TraceKind::Ran { still_running, .. } = e.kind {
            assert!(!still_running);
        }
    }
    // One dispatch per executed tick.
    let executed: u64 = result.trace.executed_ticks(10).iter().sum();
    assert_eq!(result.trace.dispatch_order().len() as u64, executed);
}
