//! Trace event recording for the simulator.
//!
//! Every scheduling action (dispatch, tick executed, preemption, I/O entry
//! and exit, finish, quantum reset, idle tick) is recorded as a
//! [`TraceEvent`] stamped with the logical tick on which it happened.

use std::fmt;
use std::io::{self, Write};

use crate::types::{Burst, Tick, WorkerId};

/// A single trace event produced by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// Logical tick; 0 for the initialization phase.
    pub tick: Tick,
    pub kind: TraceKind,
}

/// The type of scheduling event recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceKind {
    /// A worker's initial burst was ingested.
    InitBurst { worker: WorkerId, burst: Burst },
    /// A worker was selected and given the CPU.
    Dispatched {
        worker: WorkerId,
        /// Remaining burst known to the dispatcher (SRTF only).
        burst: Option<Burst>,
    },
    /// The running worker reported one executed tick.
    Ran {
        worker: WorkerId,
        /// Reported remaining burst (SRTF only).
        remaining_burst: Option<Burst>,
        /// Quantum left after this tick (RR only).
        remaining_quantum: Option<Burst>,
        /// Whether the worker keeps the CPU for the next tick.
        still_running: bool,
    },
    /// The running worker used up its quantum and went to the ready-queue tail.
    Preempted { worker: WorkerId },
    /// The running worker requested I/O.
    IoRequested {
        worker: WorkerId,
        wait: Burst,
        /// Burst the worker will run after I/O (SRTF only).
        next_burst: Option<Burst>,
    },
    /// A sleeping worker's I/O wait elapsed.
    IoCompleted { worker: WorkerId },
    /// The running worker exited.
    Finished { worker: WorkerId },
    /// Every active Ready/Running worker had an exhausted quantum.
    QuantumReset,
    /// The running worker's report did not arrive in time.
    Underrun { worker: WorkerId },
    /// No worker could be dispatched.
    Idle,
}

impl TraceKind {
    pub fn worker(&self) -> Option<WorkerId> {
        match *self {
            TraceKind::InitBurst { worker, .. }
            | TraceKind::Dispatched { worker, .. }
            | TraceKind::Ran { worker, .. }
            | TraceKind::Preempted { worker }
            | TraceKind::IoRequested { worker, .. }
            | TraceKind::IoCompleted { worker }
            | TraceKind::Finished { worker }
            | TraceKind::Underrun { worker } => Some(worker),
            TraceKind::QuantumReset | TraceKind::Idle => None,
        }
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceKind::InitBurst { worker, burst } => {
                write!(f, "[init]     worker {worker} initial burst={burst}")
            }
            TraceKind::Dispatched { worker, burst } => {
                write!(f, "[dispatch] worker {worker} starts running")?;
                if let Some(b) = burst {
                    write!(f, " (remaining burst={b})")?;
                }
                Ok(())
            }
            TraceKind::Ran {
                worker,
                remaining_burst,
                remaining_quantum,
                ..
            } => {
                write!(f, "[run]      worker {worker} ran 1 tick")?;
                if let Some(b) = remaining_burst {
                    write!(f, ", remaining burst={b}")?;
                }
                if let Some(q) = remaining_quantum {
                    write!(f, ", remaining quantum={q}")?;
                }
                Ok(())
            }
            TraceKind::Preempted { worker } => {
                write!(f, "[sched]    worker {worker} quantum used up -> READY (queue tail)")
            }
            TraceKind::IoRequested {
                worker,
                wait,
                next_burst,
            } => {
                write!(f, "[io]       worker {worker} requests I/O (wait {wait})")?;
                if let Some(b) = next_burst {
                    write!(f, ", next burst={b}")?;
                }
                Ok(())
            }
            TraceKind::IoCompleted { worker } => {
                write!(f, "[io]       worker {worker} I/O done -> READY")
            }
            TraceKind::Finished { worker } => write!(f, "[exit]     worker {worker} finished"),
            TraceKind::QuantumReset => {
                write!(f, "[sched]    every quantum exhausted, resetting all quanta")
            }
            TraceKind::Underrun { worker } => {
                write!(f, "[warn]     no report from worker {worker}, retrying next tick")
            }
            TraceKind::Idle => write!(f, "[idle]     no READY worker"),
        }
    }
}

/// Dispatcher-side view of a worker, replayed from the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replayed {
    Ready,
    Running,
    Sleeping,
    Done,
}

/// A complete simulation trace, containing all events in tick order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, tick: Tick, kind: TraceKind) {
        self.events.push(TraceEvent { tick, kind });
    }

    /// Get all events in order.
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Events recorded on a given tick.
    pub fn events_at(&self, tick: Tick) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter().filter(move |e| e.tick == tick)
    }

    /// The last tick that produced any event.
    pub fn last_tick(&self) -> Tick {
        self.events.last().map_or(0, |e| e.tick)
    }

    /// Workers in the order they were dispatched, with repeats.
    pub fn dispatch_order(&self) -> Vec<WorkerId> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                TraceKind::Dispatched { worker, .. } => Some(worker),
                _ => None,
            })
            .collect()
    }

    /// Tick of the first dispatch of `worker`.
    pub fn first_dispatch(&self, worker: WorkerId) -> Option<Tick> {
        self.events.iter().find_map(|e| match e.kind {
            TraceKind::Dispatched { worker: w, .. } if w == worker => Some(e.tick),
            _ => None,
        })
    }

    /// Count the number of times a worker was dispatched.
    pub fn dispatch_count(&self, worker: WorkerId) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceKind::Dispatched { worker: w, .. } if w == worker))
            .count()
    }

    /// Count the ticks on which the CPU sat idle.
    pub fn idle_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceKind::Idle))
            .count()
    }

    /// Ticks each worker executed, counted from its `Ran`, `IoRequested`
    /// and `Finished` reports.
    pub fn executed_ticks(&self, nr_workers: usize) -> Vec<u64> {
        let mut ran = vec![0u64; nr_workers];
        for e in &self.events {
            if let TraceKind::Ran { worker, .. }
            | TraceKind::IoRequested { worker, .. }
            | TraceKind::Finished { worker } = e.kind
            {
                if let Some(n) = ran.get_mut(worker.0) {
                    *n += 1;
                }
            }
        }
        ran
    }

    /// Recompute every worker's READY time by replaying the trace.
    ///
    /// Each tick, before any of its events, charges one tick to every
    /// worker that ended the previous tick in READY. This is independent of
    /// the PCB bookkeeping and so can cross-check it.
    pub fn ready_ticks(&self, nr_workers: usize) -> Vec<u64> {
        let mut state = vec![Replayed::Ready; nr_workers];
        let mut waits = vec![0u64; nr_workers];
        let mut tick: Tick = 0;

        for e in &self.events {
            while tick < e.tick {
                tick += 1;
                for (w, s) in waits.iter_mut().zip(&state) {
                    if *s == Replayed::Ready {
                        *w += 1;
                    }
                }
            }

            let Some(worker) = e.kind.worker() else {
                continue;
            };
            let Some(s) = state.get_mut(worker.0) else {
                continue;
            };
            match e.kind {
                TraceKind::Dispatched { .. } => *s = Replayed::Running,
                TraceKind::Ran { still_running, .. } => {
                    *s = if still_running {
                        Replayed::Running
                    } else {
                        Replayed::Ready
                    };
                }
                TraceKind::Preempted { .. } | TraceKind::IoCompleted { .. } => {
                    *s = Replayed::Ready
                }
                TraceKind::IoRequested { .. } => *s = Replayed::Sleeping,
                TraceKind::Finished { .. } => *s = Replayed::Done,
                TraceKind::InitBurst { .. }
                | TraceKind::Underrun { .. }
                | TraceKind::QuantumReset
                | TraceKind::Idle => {}
            }
        }

        waits
    }

    /// Write the human-readable tick-by-tick trace.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut current: Option<Tick> = None;
        for e in &self.events {
            if current != Some(e.tick) {
                current = Some(e.tick);
                if e.tick == 0 {
                    writeln!(w, "=== init ===")?;
                } else {
                    writeln!(w)?;
                    writeln!(w, "=== tick {} ===", e.tick)?;
                }
            }
            writeln!(w, "{}", e.kind)?;
        }
        Ok(())
    }

    /// Pretty-print the trace to stderr for debugging.
    pub fn dump(&self) {
        for e in &self.events {
            eprintln!("[tick {:>5}] {}", e.tick, e.kind);
        }
    }
}
