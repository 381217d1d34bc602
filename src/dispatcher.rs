//! Tick-driven dispatcher.
//!
//! The dispatcher owns the scheduling state, the worker pool and the
//! receive-half of the message channel. Each tick is one scheduling step,
//! in strict order:
//!
//! 1. age: count down sleepers, charge READY workers one tick of waiting
//! 2. ingest: read exactly one report from the worker signaled last tick
//! 3. rebalance: policy-wide adjustments (round-robin quantum reset)
//! 4. select and signal: keep the current worker or dispatch a new one
//!
//! The loop ends once no worker is active; every worker is then reaped
//! and the wait-time report is built.

use std::time::Instant;

use anyhow::{bail, Context, Result};
use crossbeam::channel::{self, Receiver};
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::fmt::set_sim_tick;
use crate::message::{self, MessageKind, MessageRx};
use crate::policy::Policy;
use crate::pool::{spawn_pool, WorkerPool};
use crate::report::PerformanceReport;
use crate::state::SchedState;
use crate::trace::{Trace, TraceKind};
use crate::types::{Burst, Tick, WorkerId};
use crate::worker::Worker;

/// Output of a completed run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub trace: Trace,
    pub report: PerformanceReport,
}

impl SimulationResult {
    pub fn ticks(&self) -> Tick {
        self.report.ticks
    }
}

/// Build and run a simulation to completion.
pub fn simulate(config: SimConfig) -> Result<SimulationResult> {
    Dispatcher::new(config)?.run()
}

pub struct Dispatcher {
    config: SimConfig,
    state: SchedState,
    policy: Box<dyn Policy>,
    pool: Box<dyn WorkerPool>,
    rx: MessageRx,
    /// The current worker was signaled but its report has not arrived.
    awaiting_report: bool,
}

impl Dispatcher {
    /// Validate the config, start every worker and collect their initial
    /// bursts. No tick has run when this returns.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate().context("invalid simulation config")?;

        let nr_workers = config.nr_workers();
        let quantum = config.effective_quantum();
        let workers: Vec<Worker> = if config.scripts.is_empty() {
            (0..nr_workers)
                .map(|i| Worker::new(WorkerId(i), config.seed))
                .collect()
        } else {
            config
                .scripts
                .iter()
                .enumerate()
                .map(|(i, script)| Worker::scripted(WorkerId(i), script))
                .collect()
        };

        info!(
            policy = %config.policy,
            quantum,
            seed = config.seed,
            workers = nr_workers,
            runtime = ?config.runtime,
            "simulation start"
        );

        let (tx, rx) = message::channel(config.read_timeout());
        let pool = spawn_pool(config.runtime, workers, tx).context("failed to start workers")?;
        Self::with_pool(config, pool, rx)
    }

    /// Attach an already running pool whose workers report on `rx`, then
    /// drain their `Init` reports.
    fn with_pool(config: SimConfig, pool: Box<dyn WorkerPool>, rx: MessageRx) -> Result<Self> {
        let nr_workers = config.nr_workers();
        let quantum = config.effective_quantum();
        let mut dispatcher = Dispatcher {
            state: SchedState::new(nr_workers, quantum, config.seed),
            policy: config.policy.build(),
            pool,
            rx,
            config,
            awaiting_report: false,
        };
        set_sim_tick(Some(0));
        dispatcher.drain_init()?;
        Ok(dispatcher)
    }

    pub fn state(&self) -> &SchedState {
        &self.state
    }

    pub fn tick(&self) -> Tick {
        self.state.tick
    }

    pub fn is_finished(&self) -> bool {
        self.state.active_count() == 0
    }

    /// Collect one `Init` report per worker. Other reports are dropped.
    /// Workers are admitted in index order once all bursts are known, so the
    /// starting order does not depend on report arrival order.
    fn drain_init(&mut self) -> Result<()> {
        let nr_workers = self.state.pcbs.len();
        let mut bursts: Vec<Option<Burst>> = vec![None; nr_workers];
        let mut got = 0;

        while got < nr_workers {
            let msg = self
                .rx
                .recv_blocking()
                .with_context(|| format!("only {got} of {nr_workers} workers reported"))?;
            if msg.kind != MessageKind::Init {
                debug!(worker = msg.worker_id.0, kind = ?msg.kind, "discarding report during startup");
                continue;
            }
            match bursts.get_mut(msg.worker_id.0) {
                Some(slot) if slot.is_none() => {
                    *slot = Some(msg.payload);
                    got += 1;
                }
                _ => debug!(worker = msg.worker_id.0, "discarding duplicate or unknown init"),
            }
        }

        for (idx, burst) in bursts.into_iter().enumerate() {
            let Some(burst) = burst else { continue };
            if let Some(pcb) = self.state.pcbs.get_mut(idx) {
                pcb.remaining_burst = Some(burst);
            }
            info!(worker = idx, burst, "initial burst");
            self.state.record(TraceKind::InitBurst {
                worker: WorkerId(idx),
                burst,
            });
            self.policy.admit(&mut self.state, idx);
        }
        Ok(())
    }

    /// Run one full scheduling step.
    pub fn step(&mut self) -> Result<()> {
        self.state.tick += 1;
        set_sim_tick(Some(self.state.tick));

        for idx in self.state.age() {
            self.policy.on_wake(&mut self.state, idx);
        }

        if let Some(idx) = self.state.current {
            let id = WorkerId(idx);
            let report = match self.rx.recv_from(id) {
                Some(msg) => Some(msg),
                // Whatever an exited worker sent is already queued.
                None if !self.pool.is_alive(id) => match self.rx.recv_from(id) {
                    Some(msg) => Some(msg),
                    None => bail!("worker {idx} exited without reporting"),
                },
                None => None,
            };
            match report {
                Some(msg) => {
                    self.awaiting_report = false;
                    self.policy.ingest(&mut self.state, idx, &msg);
                }
                None => {
                    // The worker still owes this report; read again next tick.
                    self.awaiting_report = true;
                    debug!(worker = idx, "report underrun");
                    self.state.record(TraceKind::Underrun { worker: id });
                }
            }
        }

        self.policy.rebalance(&mut self.state);

        if self.state.active_count() == 0 || self.awaiting_report {
            return Ok(());
        }

        let next = match self.state.current {
            Some(idx) => Some(idx),
            None => self.policy.dispatch(&mut self.state),
        };
        match next {
            Some(idx) => self
                .pool
                .signal(WorkerId(idx))
                .with_context(|| format!("failed to signal worker {idx}"))?,
            None => {
                info!("idle");
                self.state.record(TraceKind::Idle);
            }
        }
        Ok(())
    }

    /// Drive ticks until every worker is done, reap the workers and build
    /// the report. Workers are reaped even if the run fails.
    pub fn run(mut self) -> Result<SimulationResult> {
        let interval = self.config.tick_interval();
        let timer = (!interval.is_zero()).then(|| channel::tick(interval));

        let outcome = self.run_ticks(timer.as_ref());
        let reaped = self.pool.shutdown().context("failed to reap workers");
        set_sim_tick(None);
        outcome?;
        reaped?;

        let report = PerformanceReport::from_table(
            &self.state.pcbs,
            self.config.policy,
            self.state.quantum,
            self.config.seed,
            self.state.tick,
        );
        Ok(SimulationResult {
            trace: self.state.trace,
            report,
        })
    }

    fn run_ticks(&mut self, timer: Option<&Receiver<Instant>>) -> Result<()> {
        while !self.is_finished() {
            if let Some(max) = self.config.max_ticks {
                if self.state.tick >= max {
                    bail!(
                        "simulation still has {} active workers after {max} ticks",
                        self.state.active_count()
                    );
                }
            }
            if let Some(timer) = timer {
                timer.recv().context("tick timer stopped")?;
            }
            self.step()?;
        }
        info!(ticks = self.state.tick, "all workers finished");
        Ok(())
    }
}
