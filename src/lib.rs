//! schedsim - Tick-driven single-CPU scheduler simulator.
//!
//! A dispatcher drives a fixed population of synthetic workloads, each
//! alternating CPU bursts and I/O waits, under Shortest-Remaining-Time-First
//! or Round-Robin scheduling. Everything is seeded, so a given seed replays
//! the same tick-by-tick trace.
//!
//! # Architecture
//!
//! - **Workers**: private burst countdowns that execute one tick per run signal
//! - **Pool**: threaded or inline worker runtimes behind [`WorkerPool`]
//! - **Messages**: many-producer / one-consumer progress reports
//! - **PCB table / ready queue**: dispatcher-owned scheduling state
//! - **Policies**: [`Srtf`] and [`RoundRobin`] behind the [`Policy`] trait
//! - **Dispatcher**: the per-tick control loop
//! - **Report**: per-worker READY wait and the mean
//!
//! # Usage
//!
//! ```rust,no_run
//! use schedsim::*;
//!
//! let config = SimConfig::builder()
//!     .policy(PolicyKind::Rr)
//!     .quantum(2)
//!     .seed(42)
//!     .build();
//!
//! let result = simulate(config).unwrap();
//! result.trace.dump();
//! println!("{}", result.report);
//! ```

pub mod config;
pub mod dispatcher;
pub mod fmt;
pub mod message;
pub mod pcb;
pub mod policy;
pub mod pool;
pub mod ready_queue;
pub mod report;
pub mod rng;
pub mod state;
pub mod sweep;
pub mod trace;
pub mod types;
pub mod worker;

// Re-export the main public types for convenience.
pub use config::{SimConfig, SimConfigBuilder};
pub use dispatcher::{simulate, Dispatcher, SimulationResult};
pub use fmt::{sim_tick, FmtTick, SimFormat};
pub use message::{Message, MessageKind};
pub use pcb::{Pcb, PcbTable, ProcState};
pub use policy::{Policy, PolicyKind, RoundRobin, Srtf};
pub use pool::{Runtime, WorkerPool};
pub use ready_queue::ReadyQueue;
pub use report::{PerformanceReport, WorkerWait};
pub use rng::{RandomStream, DEFAULT_SEED};
pub use state::SchedState;
pub use sweep::{run_sweep, SweepRow, SWEEP_QUANTA, SWEEP_SEEDS};
pub use trace::{Trace, TraceEvent, TraceKind};
pub use types::{Burst, Tick, WorkerId};
pub use worker::{ScriptStep, Worker, WorkerScript};
