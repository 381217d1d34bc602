//! End-of-run performance report: READY wait time per worker and the mean.

use std::fmt;
use std::io::{self, Write};

use crate::pcb::PcbTable;
use crate::policy::PolicyKind;
use crate::types::{Burst, Tick, WorkerId};

/// One row of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerWait {
    pub worker: WorkerId,
    pub total_wait_time: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub policy: PolicyKind,
    pub quantum: Burst,
    pub seed: u32,
    /// Ticks the run took.
    pub ticks: Tick,
    pub waits: Vec<WorkerWait>,
}

impl PerformanceReport {
    /// Snapshot the wait counters of every PCB, active or not.
    pub fn from_table(
        pcbs: &PcbTable,
        policy: PolicyKind,
        quantum: Burst,
        seed: u32,
        ticks: Tick,
    ) -> Self {
        PerformanceReport {
            policy,
            quantum,
            seed,
            ticks,
            waits: pcbs
                .iter()
                .map(|p| WorkerWait {
                    worker: p.worker_id,
                    total_wait_time: p.total_wait_time,
                })
                .collect(),
        }
    }

    pub fn total_wait(&self) -> u64 {
        self.waits.iter().map(|w| w.total_wait_time).sum()
    }

    /// Arithmetic mean over all workers, or 0 when there are none.
    pub fn mean_wait(&self) -> f64 {
        if self.waits.is_empty() {
            0.0
        } else {
            self.total_wait() as f64 / self.waits.len() as f64
        }
    }

    pub fn wait_of(&self, worker: WorkerId) -> Option<u64> {
        self.waits
            .iter()
            .find(|w| w.worker == worker)
            .map(|w| w.total_wait_time)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "{self}")
    }
}

const RULE: &str = "======================================";
const THIN_RULE: &str = "--------------------------------------";

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        if self.policy.uses_quantum() {
            writeln!(
                f,
                " performance ({}, quantum {}, seed {})",
                self.policy, self.quantum, self.seed
            )?;
        } else {
            writeln!(f, " performance ({}, seed {})", self.policy, self.seed)?;
        }
        writeln!(f, "{RULE}")?;
        writeln!(f, "worker\tREADY wait (ticks)")?;
        writeln!(f, "{THIN_RULE}")?;
        for w in &self.waits {
            writeln!(f, "{}\t{}", w.worker, w.total_wait_time)?;
        }
        writeln!(f, "{THIN_RULE}")?;
        if self.waits.is_empty() {
            writeln!(f, "no workers ran")?;
        } else {
            writeln!(f, "mean wait: {:.2} ticks", self.mean_wait())?;
        }
        writeln!(f, "total ticks: {}", self.ticks)?;
        writeln!(f, "{RULE}")
    }
}
