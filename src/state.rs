//! Scheduler state owned by the dispatcher and threaded explicitly through
//! every policy callback.

use tracing::{debug, info};

use crate::pcb::{PcbTable, ProcState};
use crate::ready_queue::ReadyQueue;
use crate::rng::RandomStream;
use crate::trace::{Trace, TraceKind};
use crate::types::{Burst, Tick, WorkerId};

/// Everything a scheduling step reads or writes.
#[derive(Debug)]
pub struct SchedState {
    pub pcbs: PcbTable,
    /// Round-robin admission queue. Unused by SRTF.
    pub ready: ReadyQueue,
    /// PCB index that was signaled last and has not yet been retired.
    pub current: Option<usize>,
    /// Configured quantum (cosmetic for SRTF).
    pub quantum: Burst,
    pub tick: Tick,
    /// Dispatcher's own stream, used only for I/O wait lengths.
    pub rng: RandomStream,
    pub trace: Trace,
}

impl SchedState {
    pub fn new(nr_workers: usize, quantum: Burst, seed: u32) -> Self {
        SchedState {
            pcbs: PcbTable::new(nr_workers, quantum),
            ready: ReadyQueue::new(nr_workers),
            current: None,
            quantum,
            tick: 0,
            rng: RandomStream::for_dispatcher(seed),
            trace: Trace::new(),
        }
    }

    pub fn record(&mut self, kind: TraceKind) {
        self.trace.record(self.tick, kind);
    }

    pub fn active_count(&self) -> usize {
        self.pcbs.active_count()
    }

    /// Give the CPU to `idx`.
    pub fn dispatch(&mut self, idx: usize, burst: Option<Burst>) {
        if self.pcbs.transition(idx, ProcState::Running) {
            self.current = Some(idx);
            info!(worker = idx, burst = ?burst, "dispatch");
            self.record(TraceKind::Dispatched {
                worker: WorkerId(idx),
                burst,
            });
        }
    }

    /// The running worker exited.
    pub fn finish(&mut self, idx: usize) {
        if self.pcbs.transition(idx, ProcState::Done) {
            info!(worker = idx, active = self.active_count(), "finished");
            self.record(TraceKind::Finished {
                worker: WorkerId(idx),
            });
        }
        self.current = None;
    }

    /// The running worker asked for I/O: put it to sleep for a wait drawn
    /// from the dispatcher's stream.
    pub fn start_io(&mut self, idx: usize, next_burst: Option<Burst>) {
        let wait = self.rng.io_wait();
        if self.pcbs.transition(idx, ProcState::Sleeping) {
            if let Some(pcb) = self.pcbs.get_mut(idx) {
                pcb.io_wait_remaining = wait;
            }
            info!(worker = idx, wait, next_burst = ?next_burst, "io request");
            self.record(TraceKind::IoRequested {
                worker: WorkerId(idx),
                wait,
                next_burst,
            });
        }
        self.current = None;
    }

    /// Move the running worker back to READY and release the CPU.
    pub fn yield_cpu(&mut self, idx: usize) {
        self.pcbs.transition(idx, ProcState::Ready);
        self.current = None;
    }

    /// Age all PCBs, returning the indices that woke from I/O.
    pub fn age(&mut self) -> Vec<usize> {
        let aged = self.pcbs.age();
        for &idx in &aged.woken {
            debug!(worker = idx, "io complete");
            self.record(TraceKind::IoCompleted {
                worker: WorkerId(idx),
            });
        }
        aged.woken
    }
}
