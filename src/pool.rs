//! Worker runtimes.
//!
//! A [`WorkerPool`] owns the workers and delivers run signals. Two
//! runtimes exist:
//!
//! - [`ThreadedPool`]: one OS thread per worker, each parked on its own
//!   single-slot run-signal channel. Reports go through the shared
//!   [`MessageTx`].
//! - [`InlinePool`]: workers are plain state machines stepped inside the
//!   dispatcher's control flow. The report is pushed into the same channel
//!   so the dispatcher cannot tell the difference.
//!
//! Only one worker is ever signaled per tick, so both produce the same
//! trace for the same seed.

use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use crossbeam::channel::{self, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::message::{MessageKind, MessageTx};
use crate::types::WorkerId;
use crate::worker::Worker;

/// How workers are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    /// One thread per worker.
    #[default]
    Threaded,
    /// Step workers directly on the dispatcher thread.
    Inline,
}

/// Owner of the worker population.
pub trait WorkerPool {
    /// Ask worker `id` to execute one tick. Its report arrives on the
    /// message channel.
    fn signal(&mut self, id: WorkerId) -> Result<()>;

    /// Whether worker `id` can still execute and report. A worker that
    /// exited after finishing counts as gone.
    fn is_alive(&self, id: WorkerId) -> bool;

    /// Stop and reap every worker. Idempotent.
    fn shutdown(&mut self) -> Result<()>;

    /// Number of workers owned by the pool.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Start `workers` on the chosen runtime. Every worker sends its `Init`
/// report before this returns (inline) or as soon as its thread starts
/// (threaded).
pub fn spawn_pool(
    runtime: Runtime,
    workers: Vec<Worker>,
    tx: MessageTx,
) -> Result<Box<dyn WorkerPool>> {
    Ok(match runtime {
        Runtime::Threaded => Box::new(ThreadedPool::spawn(workers, tx)?),
        Runtime::Inline => Box::new(InlinePool::new(workers, tx)),
    })
}

// ---------------------------------------------------------------------------
// InlinePool
// ---------------------------------------------------------------------------

pub struct InlinePool {
    workers: Vec<Worker>,
    tx: MessageTx,
}

impl InlinePool {
    pub fn new(workers: Vec<Worker>, tx: MessageTx) -> Self {
        for worker in &workers {
            tx.send(worker.init_message());
        }
        InlinePool { workers, tx }
    }
}

impl WorkerPool for InlinePool {
    fn signal(&mut self, id: WorkerId) -> Result<()> {
        let worker = self
            .workers
            .get_mut(id.0)
            .ok_or_else(|| anyhow!("no worker {id}"))?;
        if worker.is_finished() {
            bail!("worker {id} signaled after it finished");
        }
        let msg = worker.run_tick();
        trace!(worker = id.0, kind = ?msg.kind, payload = msg.payload, "inline tick");
        self.tx.send(msg);
        Ok(())
    }

    fn is_alive(&self, id: WorkerId) -> bool {
        self.workers.get(id.0).is_some_and(|w| !w.is_finished())
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> usize {
        self.workers.len()
    }
}

// ---------------------------------------------------------------------------
// ThreadedPool
// ---------------------------------------------------------------------------

/// Run signal. Carries nothing; receiving it means "execute one tick".
#[derive(Debug, Clone, Copy)]
struct RunSignal;

struct WorkerThread {
    id: WorkerId,
    run_tx: Option<Sender<RunSignal>>,
    join: Option<JoinHandle<()>>,
}

pub struct ThreadedPool {
    threads: Vec<WorkerThread>,
}

impl ThreadedPool {
    /// Spawn one named thread per worker. Any spawn failure tears down the
    /// threads started so far and is returned as an error.
    pub fn spawn(workers: Vec<Worker>, tx: MessageTx) -> Result<Self> {
        let mut pool = ThreadedPool {
            threads: Vec::with_capacity(workers.len()),
        };

        for worker in workers {
            let id = worker.id();
            let (run_tx, run_rx) = channel::bounded(1);
            let tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || worker_main(worker, run_rx, tx))
                .with_context(|| format!("failed to spawn worker {id}"));

            let join = match spawned {
                Ok(join) => join,
                Err(e) => {
                    let _ = pool.shutdown();
                    return Err(e);
                }
            };
            pool.threads.push(WorkerThread {
                id,
                run_tx: Some(run_tx),
                join: Some(join),
            });
        }

        Ok(pool)
    }
}

/// Body of a worker thread: report the initial burst, then execute one
/// tick per run signal until finished or until the run channel closes.
fn worker_main(mut worker: Worker, run_rx: Receiver<RunSignal>, tx: MessageTx) {
    let id = worker.id();
    if !tx.send(worker.init_message()) {
        return;
    }
    while run_rx.recv().is_ok() {
        let msg = worker.run_tick();
        trace!(worker = id.0, kind = ?msg.kind, payload = msg.payload, "worker tick");
        let done = msg.kind == MessageKind::Finished;
        if !tx.send(msg) || done {
            break;
        }
    }
    debug!(worker = id.0, "worker exiting");
}

impl WorkerPool for ThreadedPool {
    fn signal(&mut self, id: WorkerId) -> Result<()> {
        let run_tx = self
            .threads
            .get(id.0)
            .and_then(|t| t.run_tx.as_ref())
            .ok_or_else(|| anyhow!("no worker {id}"))?;
        run_tx
            .send(RunSignal)
            .map_err(|_| anyhow!("worker {id} exited before it was signaled"))
    }

    fn is_alive(&self, id: WorkerId) -> bool {
        self.threads
            .get(id.0)
            .and_then(|t| t.join.as_ref())
            .is_some_and(|join| !join.is_finished())
    }

    fn shutdown(&mut self) -> Result<()> {
        // Closing every run channel releases workers still parked on it.
        for t in &mut self.threads {
            t.run_tx.take();
        }

        let mut panicked = Vec::new();
        for t in &mut self.threads {
            if let Some(join) = t.join.take() {
                if join.join().is_err() {
                    panicked.push(t.id);
                }
            }
        }

        if !panicked.is_empty() {
            bail!("worker threads panicked: {panicked:?}");
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.threads.len()
    }
}

impl Drop for ThreadedPool {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::message::{self, Message};
    use crate::worker::WorkerScript;

    fn scripted(bursts: &[i32]) -> Vec<Worker> {
        bursts
            .iter()
            .enumerate()
            .map(|(i, &b)| Worker::scripted(WorkerId(i), &WorkerScript::finish_after(b)))
            .collect()
    }

    #[test]
    fn test_inline_sends_init_in_order() {
        let (tx, rx) = message::channel(Duration::from_millis(5));
        let pool = InlinePool::new(scripted(&[3, 1]), tx);
        assert_eq!(pool.len(), 2);
        assert_eq!(rx.recv_blocking().unwrap(), Message::init(WorkerId(0), 3));
        assert_eq!(rx.recv_blocking().unwrap(), Message::init(WorkerId(1), 1));
    }

    #[test]
    fn test_inline_signal_after_finish_is_error() {
        let (tx, _rx) = message::channel(Duration::from_millis(5));
        let mut pool = InlinePool::new(scripted(&[1]), tx);
        assert!(pool.is_alive(WorkerId(0)));
        pool.signal(WorkerId(0)).unwrap();
        assert!(!pool.is_alive(WorkerId(0)));
        assert!(pool.signal(WorkerId(0)).is_err());
        assert!(pool.signal(WorkerId(7)).is_err());
    }

    #[test]
    fn test_threaded_round_trip_and_reap() {
        let (tx, rx) = message::channel(Duration::from_secs(5));
        let mut pool = ThreadedPool::spawn(scripted(&[2, 2]), tx).unwrap();

        let mut inits = 0;
        while inits < 2 {
            assert_eq!(rx.recv_blocking().unwrap().kind, MessageKind::Init);
            inits += 1;
        }

        pool.signal(WorkerId(1)).unwrap();
        assert_eq!(
            rx.recv_from(WorkerId(1)),
            Some(Message::tick_progress(WorkerId(1), 1))
        );
        pool.signal(WorkerId(1)).unwrap();
        assert_eq!(rx.recv_from(WorkerId(1)), Some(Message::finished(WorkerId(1))));

        assert!(pool.is_alive(WorkerId(0)));
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while pool.is_alive(WorkerId(1)) {
            assert!(std::time::Instant::now() < deadline, "worker 1 never exited");
            std::thread::sleep(Duration::from_millis(1));
        }

        // Worker 0 is still parked; shutdown must release and join it.
        pool.shutdown().unwrap();
        pool.shutdown().unwrap();
        assert!(!pool.is_alive(WorkerId(0)));
    }
}
