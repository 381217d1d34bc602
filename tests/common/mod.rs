#![allow(dead_code)]

use tracing_subscriber::EnvFilter;

use schedsim::{
    simulate, PolicyKind, Runtime, SimConfig, SimConfigBuilder, SimFormat, SimulationResult,
    Trace, TraceKind, WorkerId, WorkerScript,
};

/// Initialize tracing from `RUST_LOG`, stamped with the logical tick.
///
/// `try_init()` is idempotent: first call in the process succeeds,
/// subsequent calls are silently ignored.
pub fn setup_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .event_format(SimFormat)
        .with_test_writer()
        .try_init();
}

/// Inline runtime with a generous tick limit, so a scheduling bug shows up
/// as a test failure instead of a hang.
pub fn inline(policy: PolicyKind) -> SimConfigBuilder {
    SimConfig::builder()
        .policy(policy)
        .runtime(Runtime::Inline)
        .max_ticks(10_000)
}

pub fn scripted(policy: PolicyKind, quantum: i32, scripts: &[WorkerScript]) -> SimConfig {
    scripts
        .iter()
        .cloned()
        .fold(inline(policy).quantum(quantum), |b, s| b.script(s))
        .build()
}

pub fn run(config: SimConfig) -> SimulationResult {
    let result = simulate(config).expect("simulation failed");
    if std::env::var_os("SCHEDSIM_DUMP").is_some() {
        result.trace.dump();
    }
    result
}

pub fn ids(raw: &[usize]) -> Vec<WorkerId> {
    raw.iter().map(|&i| WorkerId(i)).collect()
}

/// Ticks on which `pred` matched an event.
pub fn ticks_where(trace: &Trace, pred: impl Fn(&TraceKind) -> bool) -> Vec<u64> {
    trace
        .events()
        .iter()
        .filter(|e| pred(&e.kind))
        .map(|e| e.tick)
        .collect()
}
