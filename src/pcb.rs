//! Process control blocks: the dispatcher's authoritative view of every
//! worker.
//!
//! State machine:
//!
//! ```text
//!   Ready ──dispatch──▶ Running ──finished──▶ Done
//!     ▲                  │  │
//!     └──preempt/yield───┘  └──io request──▶ Sleeping
//!     ▲                                        │
//!     └────────────io wait elapsed─────────────┘
//! ```
//!
//! Done is absorbing. Any other transition is rejected.

use std::fmt;

use tracing::warn;

use crate::types::{Burst, WorkerId};

/// Lifecycle state of a worker as seen by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Ready,
    Running,
    Sleeping,
    Done,
}

impl ProcState {
    /// Whether `self → to` is a legal transition.
    pub fn can_transition(self, to: ProcState) -> bool {
        use ProcState::*;
        matches!(
            (self, to),
            (Ready, Running)
                | (Running, Ready)
                | (Running, Sleeping)
                | (Running, Done)
                | (Sleeping, Ready)
        )
    }
}

impl fmt::Display for ProcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcState::Ready => "READY",
            ProcState::Running => "RUNNING",
            ProcState::Sleeping => "SLEEPING",
            ProcState::Done => "DONE",
        };
        f.write_str(s)
    }
}

/// One worker's scheduling record.
#[derive(Debug, Clone)]
pub struct Pcb {
    pub worker_id: WorkerId,
    state: ProcState,
    /// Remaining burst as last reported by the worker. `None` until the
    /// worker's `Init` report has been ingested.
    pub remaining_burst: Option<Burst>,
    /// Ticks left in the current round-robin quantum.
    pub remaining_quantum: Burst,
    /// Ticks left asleep while in `Sleeping`.
    pub io_wait_remaining: Burst,
    /// Ticks spent in `Ready`. Never decreases.
    pub total_wait_time: u64,
    pub active: bool,
    /// Whether this PCB currently sits in the ready queue.
    pub in_ready_queue: bool,
}

impl Pcb {
    pub fn new(worker_id: WorkerId, quantum: Burst) -> Self {
        Pcb {
            worker_id,
            state: ProcState::Ready,
            remaining_burst: None,
            remaining_quantum: quantum,
            io_wait_remaining: 0,
            total_wait_time: 0,
            active: true,
            in_ready_queue: false,
        }
    }

    pub fn state(&self) -> ProcState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.active && self.state == ProcState::Ready
    }
}

/// Outcome of one aging pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Aged {
    /// Workers whose I/O wait elapsed this tick, in index order.
    pub woken: Vec<usize>,
}

/// All PCBs, indexed by worker id.
#[derive(Debug, Clone)]
pub struct PcbTable {
    pcbs: Vec<Pcb>,
    active_count: usize,
}

impl PcbTable {
    pub fn new(nr_workers: usize, quantum: Burst) -> Self {
        PcbTable {
            pcbs: (0..nr_workers)
                .map(|i| Pcb::new(WorkerId(i), quantum))
                .collect(),
            active_count: nr_workers,
        }
    }

    pub fn len(&self) -> usize {
        self.pcbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pcbs.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn get(&self, idx: usize) -> Option<&Pcb> {
        self.pcbs.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Pcb> {
        self.pcbs.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pcb> {
        self.pcbs.iter()
    }

    /// Move PCB `idx` to `to`. Illegal transitions are refused and return
    /// false. Entering `Done` clears `active` and decrements the active
    /// count.
    pub fn transition(&mut self, idx: usize, to: ProcState) -> bool {
        let Some(pcb) = self.pcbs.get_mut(idx) else {
            return false;
        };
        if !pcb.state.can_transition(to) {
            debug_assert!(
                false,
                "illegal transition {} -> {} for worker {}",
                pcb.state, to, pcb.worker_id
            );
            warn!(worker = idx, from = %pcb.state, to = %to, "illegal transition refused");
            return false;
        }
        pcb.state = to;
        if to == ProcState::Done {
            pcb.active = false;
            pcb.in_ready_queue = false;
            self.active_count -= 1;
        }
        true
    }

    /// Per-tick aging: count down sleepers (waking those that reach zero)
    /// and charge one tick of waiting to every Ready PCB.
    ///
    /// A sleeper woken this tick is not charged until the next tick.
    pub fn age(&mut self) -> Aged {
        let mut aged = Aged::default();
        for (idx, pcb) in self.pcbs.iter_mut().enumerate() {
            if !pcb.active {
                continue;
            }
            match pcb.state {
                ProcState::Sleeping => {
                    pcb.io_wait_remaining -= 1;
                    if pcb.io_wait_remaining <= 0 {
                        pcb.state = ProcState::Ready;
                        aged.woken.push(idx);
                    }
                }
                ProcState::Ready => pcb.total_wait_time += 1,
                ProcState::Running | ProcState::Done => {}
            }
        }
        aged
    }

    /// Index of the Running PCB, if any.
    pub fn running(&self) -> Option<usize> {
        self.pcbs
            .iter()
            .position(|p| p.state == ProcState::Running)
    }

    /// True when no active Ready or Running PCB has quantum left. Vacuously
    /// true when every active PCB is asleep.
    pub fn all_quanta_exhausted(&self) -> bool {
        self.pcbs
            .iter()
            .filter(|p| p.active)
            .filter(|p| matches!(p.state, ProcState::Ready | ProcState::Running))
            .all(|p| p.remaining_quantum <= 0)
    }

    /// Give every active PCB a fresh quantum.
    pub fn reset_quanta(&mut self, quantum: Burst) {
        for pcb in self.pcbs.iter_mut().filter(|p| p.active) {
            pcb.remaining_quantum = quantum;
        }
    }
}
