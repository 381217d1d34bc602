//! Scheduling policies.
//!
//! A [`Policy`] is driven by the dispatcher once per tick, in this order:
//! [`Policy::on_wake`] for each worker whose I/O finished,
//! [`Policy::ingest`] for the running worker's report,
//! [`Policy::rebalance`], then [`Policy::dispatch`] if the CPU is free.
//! All state lives in [`SchedState`]; policies only keep their own
//! bookkeeping.

mod round_robin;
mod srtf;

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use round_robin::RoundRobin;
pub use srtf::Srtf;

use crate::message::Message;
use crate::state::SchedState;
use crate::types::Burst;

/// Which policy to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Shortest-Remaining-Time-First, re-evaluated every tick.
    Srtf,
    /// Round-robin with a fixed quantum.
    #[default]
    Rr,
}

impl PolicyKind {
    /// Quantum used when none is configured.
    pub fn default_quantum(self) -> Burst {
        match self {
            PolicyKind::Srtf => 1,
            PolicyKind::Rr => 5,
        }
    }

    /// Whether the quantum affects scheduling decisions.
    pub fn uses_quantum(self) -> bool {
        matches!(self, PolicyKind::Rr)
    }

    pub fn build(self) -> Box<dyn Policy> {
        match self {
            PolicyKind::Srtf => Box::new(Srtf::new()),
            PolicyKind::Rr => Box::new(RoundRobin::new()),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Srtf => f.write_str("SRTF"),
            PolicyKind::Rr => f.write_str("RR"),
        }
    }
}

/// A selection rule plus the policy-specific handling of worker reports.
pub trait Policy: Send {
    fn kind(&self) -> PolicyKind;

    /// Admit a worker after its `Init` report has been ingested.
    fn admit(&mut self, _state: &mut SchedState, _idx: usize) {}

    /// A sleeping worker became READY during aging.
    fn on_wake(&mut self, _state: &mut SchedState, _idx: usize) {}

    /// Apply the running worker's report for the tick it just executed.
    fn ingest(&mut self, state: &mut SchedState, idx: usize, msg: &Message);

    /// Runs after ingestion and before selection on every tick.
    fn rebalance(&mut self, _state: &mut SchedState) {}

    /// Pick the next worker for an idle CPU and mark it running through
    /// [`SchedState::dispatch`]. Returns `None` if the CPU stays idle.
    fn dispatch(&mut self, state: &mut SchedState) -> Option<usize>;
}
