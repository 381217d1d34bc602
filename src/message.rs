//! Worker → dispatcher progress channel.
//!
//! Many workers hold a [`MessageTx`]; the dispatcher holds the single
//! [`MessageRx`]. Each sender's messages arrive in send order. The
//! dispatcher only ever waits for one message per tick, from the worker it
//! last signaled, and gives up after a bounded wait.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::debug;

use crate::types::{Burst, WorkerId};

/// The kind of report a worker sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Initial burst length, sent once at startup.
    Init,
    /// One tick executed, burst not yet exhausted.
    TickProgress,
    /// Burst exhausted, worker goes to I/O. Payload is the next burst.
    IoRequest,
    /// Burst exhausted, worker exits.
    Finished,
}

/// Fixed-shape progress report.
///
/// `payload` is the worker's remaining burst for `Init`, `TickProgress`
/// and `IoRequest`, and zero for `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub worker_id: WorkerId,
    pub kind: MessageKind,
    pub payload: Burst,
}

impl Message {
    pub fn init(worker_id: WorkerId, burst: Burst) -> Self {
        Message {
            worker_id,
            kind: MessageKind::Init,
            payload: burst,
        }
    }

    pub fn tick_progress(worker_id: WorkerId, remaining: Burst) -> Self {
        Message {
            worker_id,
            kind: MessageKind::TickProgress,
            payload: remaining,
        }
    }

    pub fn io_request(worker_id: WorkerId, next_burst: Burst) -> Self {
        Message {
            worker_id,
            kind: MessageKind::IoRequest,
            payload: next_burst,
        }
    }

    pub fn finished(worker_id: WorkerId) -> Self {
        Message {
            worker_id,
            kind: MessageKind::Finished,
            payload: 0,
        }
    }
}

/// Create the shared channel. `read_timeout` bounds how long the
/// dispatcher waits for the running worker's report each tick.
pub fn channel(read_timeout: Duration) -> (MessageTx, MessageRx) {
    let (tx, rx) = channel::unbounded();
    (MessageTx { tx }, MessageRx { rx, read_timeout })
}

/// Send-half held by each worker.
#[derive(Debug, Clone)]
pub struct MessageTx {
    tx: Sender<Message>,
}

impl MessageTx {
    /// Returns false if the dispatcher has already gone away.
    pub fn send(&self, msg: Message) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Receive-half held by the dispatcher.
#[derive(Debug)]
pub struct MessageRx {
    rx: Receiver<Message>,
    read_timeout: Duration,
}

impl MessageRx {
    /// Block until the next message arrives. Used while draining `Init`
    /// reports, where every worker is expected to speak.
    pub fn recv_blocking(&self) -> Result<Message> {
        self.rx
            .recv()
            .map_err(|_| anyhow!("all workers disconnected before reporting"))
    }

    /// Read the report of `expected` within the bounded wait.
    ///
    /// Messages from any other worker are dropped. Returns `None` on
    /// underrun (deadline passed or every sender gone).
    pub fn recv_from(&self, expected: WorkerId) -> Option<Message> {
        let deadline = Instant::now() + self.read_timeout;
        loop {
            match self.rx.recv_deadline(deadline) {
                Ok(msg) if msg.worker_id == expected => return Some(msg),
                Ok(msg) => {
                    debug!(
                        worker = msg.worker_id.0,
                        expected = expected.0,
                        "dropping report from non-running worker"
                    );
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }

    /// Number of reports waiting in the channel.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_sender_order() {
        let (tx, rx) = channel(Duration::from_millis(10));
        tx.send(Message::tick_progress(WorkerId(1), 3));
        tx.send(Message::tick_progress(WorkerId(1), 2));
        assert_eq!(rx.recv_from(WorkerId(1)).unwrap().payload, 3);
        assert_eq!(rx.recv_from(WorkerId(1)).unwrap().payload, 2);
    }

    #[test]
    fn test_underrun_is_none() {
        let (_tx, rx) = channel(Duration::from_millis(5));
        assert!(rx.recv_from(WorkerId(0)).is_none());
    }

    #[test]
    fn test_stray_reports_are_dropped() {
        let (tx, rx) = channel(Duration::from_millis(5));
        tx.send(Message::finished(WorkerId(2)));
        tx.send(Message::io_request(WorkerId(0), 4));
        let msg = rx.recv_from(WorkerId(0)).unwrap();
        assert_eq!(msg.kind, MessageKind::IoRequest);
        assert_eq!(msg.payload, 4);
        assert_eq!(rx.pending(), 0);
    }

    #[test]
    fn test_recv_blocking_fails_when_senders_gone() {
        let (tx, rx) = channel(Duration::from_millis(5));
        tx.send(Message::init(WorkerId(0), 5));
        drop(tx);
        assert_eq!(rx.recv_blocking().unwrap().kind, MessageKind::Init);
        assert!(rx.recv_blocking().is_err());
    }
}
