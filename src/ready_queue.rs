//! Round-robin admission queue.
//!
//! A bounded circular FIFO of PCB indices with capacity equal to the worker
//! count. Membership is mirrored in [`Pcb::in_ready_queue`] so a worker can
//! never be queued twice.
//!
//! [`Pcb::in_ready_queue`]: crate::pcb::Pcb::in_ready_queue

use crate::pcb::PcbTable;

#[derive(Debug, Clone)]
pub struct ReadyQueue {
    slots: Vec<usize>,
    front: usize,
    rear: usize,
    count: usize,
}

impl ReadyQueue {
    pub fn new(capacity: usize) -> Self {
        ReadyQueue {
            slots: vec![0; capacity],
            front: 0,
            rear: 0,
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    /// Append `idx` at the tail. No-op (returns false) if the index is out
    /// of range, the PCB is inactive or already queued, or the queue is
    /// full.
    pub fn push(&mut self, pcbs: &mut PcbTable, idx: usize) -> bool {
        let Some(pcb) = pcbs.get_mut(idx) else {
            return false;
        };
        if !pcb.active || pcb.in_ready_queue || self.is_full() {
            return false;
        }

        self.slots[self.rear] = idx;
        self.rear = (self.rear + 1) % self.slots.len();
        self.count += 1;
        pcb.in_ready_queue = true;
        true
    }

    /// Remove and return the head.
    pub fn pop(&mut self, pcbs: &mut PcbTable) -> Option<usize> {
        if self.is_empty() {
            return None;
        }

        let idx = self.slots[self.front];
        self.front = (self.front + 1) % self.slots.len();
        self.count -= 1;
        if let Some(pcb) = pcbs.get_mut(idx) {
            pcb.in_ready_queue = false;
        }
        Some(idx)
    }

    /// Queued indices from head to tail.
    pub fn to_vec(&self) -> Vec<usize> {
        (0..self.count)
            .map(|i| self.slots[(self.front + i) % self.slots.len()])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::ProcState;

    #[test]
    fn test_fifo_order_and_wraparound() {
        let mut pcbs = PcbTable::new(3, 1);
        let mut q = ReadyQueue::new(3);
        for i in 0..3 {
            assert!(q.push(&mut pcbs, i));
        }
        assert!(q.is_full());
        assert_eq!(q.pop(&mut pcbs), Some(0));
        assert!(q.push(&mut pcbs, 0));
        assert_eq!(q.to_vec(), vec![1, 2, 0]);
        assert_eq!(q.pop(&mut pcbs), Some(1));
        assert_eq!(q.pop(&mut pcbs), Some(2));
        assert_eq!(q.pop(&mut pcbs), Some(0));
        assert_eq!(q.pop(&mut pcbs), None);
    }

    #[test]
    fn test_duplicate_push_is_noop() {
        let mut pcbs = PcbTable::new(2, 1);
        let mut q = ReadyQueue::new(2);
        assert!(q.push(&mut pcbs, 1));
        assert!(!q.push(&mut pcbs, 1));
        assert_eq!(q.len(), 1);
        assert!(pcbs.get(1).unwrap().in_ready_queue);
        q.pop(&mut pcbs);
        assert!(!pcbs.get(1).unwrap().in_ready_queue);
    }

    #[test]
    fn test_inactive_and_out_of_range_rejected() {
        let mut pcbs = PcbTable::new(2, 1);
        pcbs.transition(0, ProcState::Running);
        pcbs.transition(0, ProcState::Done);
        let mut q = ReadyQueue::new(2);
        assert!(!q.push(&mut pcbs, 0));
        assert!(!q.push(&mut pcbs, 5));
        assert!(q.is_empty());
    }
}
