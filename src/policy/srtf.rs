//! Shortest-Remaining-Time-First.
//!
//! The running worker goes back to READY after every executed tick and the
//! whole PCB table is rescanned, so a worker returning from I/O with a
//! shorter burst preempts on the very next tick. Ties go to the lowest
//! index.

use tracing::{debug, warn};

use super::{Policy, PolicyKind};
use crate::message::{Message, MessageKind};
use crate::state::SchedState;
use crate::trace::TraceKind;
use crate::types::WorkerId;

#[derive(Debug, Default)]
pub struct Srtf;

impl Srtf {
    pub fn new() -> Self {
        Srtf
    }

    /// Index of the READY worker with the least known remaining burst.
    pub fn pick(state: &SchedState) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;
        for (idx, pcb) in state.pcbs.iter().enumerate() {
            if !pcb.is_ready() {
                continue;
            }
            let Some(burst) = pcb.remaining_burst.filter(|b| *b >= 0) else {
                continue;
            };
            // Strict comparison keeps the lowest index on ties.
            if best.map_or(true, |(_, b)| burst < b) {
                best = Some((idx, burst));
            }
        }
        best.map(|(idx, _)| idx)
    }
}

impl Policy for Srtf {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Srtf
    }

    fn ingest(&mut self, state: &mut SchedState, idx: usize, msg: &Message) {
        match msg.kind {
            MessageKind::Finished => {
                if let Some(pcb) = state.pcbs.get_mut(idx) {
                    pcb.remaining_burst = Some(0);
                }
                state.finish(idx);
            }
            MessageKind::IoRequest => {
                if let Some(pcb) = state.pcbs.get_mut(idx) {
                    pcb.remaining_burst = Some(msg.payload);
                }
                state.start_io(idx, Some(msg.payload));
            }
            MessageKind::TickProgress => {
                if let Some(pcb) = state.pcbs.get_mut(idx) {
                    pcb.remaining_burst = Some(msg.payload);
                }
                debug!(worker = idx, remaining = msg.payload, "tick executed");
                state.record(TraceKind::Ran {
                    worker: WorkerId(idx),
                    remaining_burst: Some(msg.payload),
                    remaining_quantum: None,
                    still_running: false,
                });
                state.yield_cpu(idx);
            }
            MessageKind::Init => {
                warn!(worker = idx, "unexpected init report from running worker");
            }
        }
    }

    fn dispatch(&mut self, state: &mut SchedState) -> Option<usize> {
        let idx = Self::pick(state)?;
        let burst = state.pcbs.get(idx).and_then(|p| p.remaining_burst);
        state.dispatch(idx, burst);
        Some(idx)
    }
}
