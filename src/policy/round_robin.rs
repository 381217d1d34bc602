//! Round-robin with a fixed quantum.
//!
//! The dispatcher does not know true burst lengths here, only its own
//! quantum countdown. A worker keeps the CPU across ticks until its quantum
//! or its burst ends; quantum exhaustion sends it to the ready-queue tail.
//!
//! When every active READY/RUNNING worker has an exhausted quantum at once,
//! all active workers get a fresh quantum. Without the reset, a round would
//! end with nothing schedulable while sleepers that wake up still hold an
//! unused quantum.

use tracing::{debug, info, warn};

use super::{Policy, PolicyKind};
use crate::message::{Message, MessageKind};
use crate::pcb::ProcState;
use crate::state::SchedState;
use crate::trace::TraceKind;
use crate::types::WorkerId;

#[derive(Debug, Default)]
pub struct RoundRobin;

impl RoundRobin {
    pub fn new() -> Self {
        RoundRobin
    }
}

impl Policy for RoundRobin {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Rr
    }

    fn admit(&mut self, state: &mut SchedState, idx: usize) {
        state.ready.push(&mut state.pcbs, idx);
    }

    fn on_wake(&mut self, state: &mut SchedState, idx: usize) {
        state.ready.push(&mut state.pcbs, idx);
    }

    fn ingest(&mut self, state: &mut SchedState, idx: usize, msg: &Message) {
        let Some(pcb) = state.pcbs.get_mut(idx) else {
            return;
        };
        if msg.kind == MessageKind::Init {
            warn!(worker = idx, "unexpected init report from running worker");
            return;
        }
        pcb.remaining_quantum -= 1;
        let quantum = pcb.remaining_quantum;

        match msg.kind {
            MessageKind::Finished => state.finish(idx),
            MessageKind::IoRequest => state.start_io(idx, None),
            MessageKind::TickProgress => {
                let still_running = quantum > 0;
                debug!(worker = idx, quantum, "tick executed");
                state.record(TraceKind::Ran {
                    worker: WorkerId(idx),
                    remaining_burst: None,
                    remaining_quantum: Some(quantum),
                    still_running,
                });
                if !still_running {
                    state.yield_cpu(idx);
                    state.ready.push(&mut state.pcbs, idx);
                    info!(worker = idx, "quantum used up");
                    state.record(TraceKind::Preempted {
                        worker: WorkerId(idx),
                    });
                }
            }
            MessageKind::Init => {}
        }
    }

    fn rebalance(&mut self, state: &mut SchedState) {
        if state.active_count() > 0 && state.pcbs.all_quanta_exhausted() {
            info!(quantum = state.quantum, "resetting all quanta");
            state.pcbs.reset_quanta(state.quantum);
            state.record(TraceKind::QuantumReset);
        }
    }

    fn dispatch(&mut self, state: &mut SchedState) -> Option<usize> {
        // Each queued entry is looked at most once per dispatch attempt.
        let tries = state.ready.len();
        for _ in 0..tries {
            let idx = state.ready.pop(&mut state.pcbs)?;
            let Some(pcb) = state.pcbs.get(idx) else {
                continue;
            };
            if !pcb.active || pcb.state() != ProcState::Ready {
                continue;
            }
            if pcb.remaining_quantum <= 0 {
                state.ready.push(&mut state.pcbs, idx);
                continue;
            }
            state.dispatch(idx, None);
            return Some(idx);
        }
        None
    }
}
