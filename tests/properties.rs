use schedsim::*;

mod common;

const POLICIES: [PolicyKind; 2] = [PolicyKind::Srtf, PolicyKind::Rr];

#[test]
fn test_same_seed_same_run() {
    common::setup_test();
    for policy in POLICIES {
        for seed in [42, 82] {
            let a = common::run(common::inline(policy).quantum(2).seed(seed).build());
            let b = common::run(common::inline(policy).quantum(2).seed(seed).build());
            assert_eq!(a.trace, b.trace, "{policy} seed {seed}");
            assert_eq!(a.report, b.report, "{policy} seed {seed}");
        }
    }
}

#[test]
fn test_different_seeds_differ() {
    common::setup_test();
    let a = common::run(common::inline(PolicyKind::Rr).seed(42).build());
    let b = common::run(common::inline(PolicyKind::Rr).seed(52).build());
    assert_ne!(a.trace, b.trace);
}

/// Threads change when reports arrive, never what the trace says.
#[test]
fn test_threaded_matches_inline() {
    common::setup_test();
    for policy in POLICIES {
        let base = common::inline(policy).quantum(3).seed(82).read_timeout_ms(5_000);
        let inline = common::run(base.clone().build());
        let threaded = common::run(base.runtime(Runtime::Threaded).build());
        assert_eq!(inline.trace, threaded.trace, "{policy}");
        assert_eq!(inline.report, threaded.report, "{policy}");
    }
}

/// Reported waits equal the READY ticks replayed from the trace, and the
/// mean is their average.
#[test]
fn test_wait_time_accounting() {
    common::setup_test();
    for policy in POLICIES {
        for seed in [42, 52, 62, 72, 82] {
            let result = common::run(common::inline(policy).quantum(2).seed(seed).build());
            let replayed = result.trace.ready_ticks(10);
            let reported: Vec<u64> = result
                .report
                .waits
                .iter()
                .map(|w| w.total_wait_time)
                .collect();
            assert_eq!(reported, replayed, "{policy} seed {seed}");

            let mean = replayed.iter().sum::<u64>() as f64 / replayed.len() as f64;
            assert!((result.report.mean_wait() - mean).abs() < 1e-9);
        }
    }
}

#[test]
fn test_every_run_terminates() {
    common::setup_test();
    for policy in POLICIES {
        for seed in 0..40u32 {
            let config = common::inline(policy).quantum(1 + (seed % 5) as i32).seed(seed).build();
            let result = simulate(config)
                .unwrap_or_else(|e| panic!("{policy} seed {seed} did not finish: {e:#}"));
            let finished = result
                .trace
                .events()
                .iter()
                .filter(|e| matches!(e.kind, TraceKind::Finished { .. }))
                .count();
            assert_eq!(finished, 10);
        }
    }
}

/// Each worker reports INIT once, at tick 0, and nothing happens to it
/// after it finishes.
#[test]
fn test_worker_lifecycle_in_trace() {
    common::setup_test();
    for policy in POLICIES {
        let result = common::run(common::inline(policy).seed(72).build());
        for i in 0..10 {
            let w = WorkerId(i);
            let events: Vec<&TraceEvent> = result
                .trace
                .events()
                .iter()
                .filter(|e| e.kind.worker() == Some(w))
                .collect();

            let inits: Vec<_> = events
                .iter()
                .filter(|e| matches!(e.kind, TraceKind::InitBurst { .. }))
                .collect();
            assert_eq!(inits.len(), 1);
            assert_eq!(inits[0].tick, 0);

            let last = events.last().unwrap();
            assert!(
                matches!(last.kind, TraceKind::Finished { .. }),
                "{policy} {w}: last event {}",
                last.kind
            );
        }
    }
}

/// The CPU is idle only when no worker is READY.
#[test]
fn test_idle_only_without_ready_workers() {
    common::setup_test();
    for policy in POLICIES {
        let mut d = Dispatcher::new(common::inline(policy).quantum(2).seed(42).build()).unwrap();
        while !d.is_finished() {
            d.step().unwrap();
            let state = d.state();
            let idle = state
                .trace
                .events_at(state.tick)
                .any(|e| e.kind == TraceKind::Idle);
            if idle {
                assert!(state.pcbs.iter().all(|p| !p.is_ready()));
                assert_eq!(state.current, None);
            }
        }
    }
}

#[test]
fn test_initial_bursts_follow_worker_streams() {
    common::setup_test();
    let result = common::run(common::inline(PolicyKind::Srtf).seed(82).build());
    for e in result.trace.events_at(0) {
        let TraceKind::InitBurst { worker, burst } = e.kind else {
            panic!("unexpected init event {}", e.kind);
        };
        let mut stream = RandomStream::for_worker(82, worker);
        assert_eq!(burst, stream.initial_burst());
    }
}
