//! Synthetic workload model.
//!
//! A worker owns a private countdown of CPU ticks for its current burst.
//! It never decides when it runs: each run signal executes exactly one
//! tick and produces exactly one [`Message`].
//!
//! Workers draw from their own [`RandomStream`] unless built from a
//! [`WorkerScript`], which fixes the initial burst and what happens at
//! each burst exhaustion.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::rng::{CoinFlip, RandomStream};
use crate::types::{Burst, WorkerId};

/// Outcome of one exhausted burst in a scripted worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStep {
    /// Exit.
    Finish,
    /// Request I/O and come back with a burst of the given length.
    Io(Burst),
}

/// Fixed behavior for a worker, used to build exact scenarios.
///
/// Once `after_burst` runs out, the next exhaustion finishes the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerScript {
    pub initial_burst: Burst,
    #[serde(default)]
    pub after_burst: Vec<ScriptStep>,
}

impl WorkerScript {
    /// A worker that runs `burst` ticks and exits.
    pub fn finish_after(burst: Burst) -> Self {
        WorkerScript {
            initial_burst: burst,
            after_burst: Vec::new(),
        }
    }

    pub fn then(mut self, step: ScriptStep) -> Self {
        self.after_burst.push(step);
        self
    }
}

#[derive(Debug, Clone)]
enum Source {
    Random(RandomStream),
    Scripted(VecDeque<ScriptStep>),
}

impl Source {
    fn next_step(&mut self) -> ScriptStep {
        match self {
            Source::Random(rng) => match rng.coin_flip() {
                CoinFlip::Finish => ScriptStep::Finish,
                CoinFlip::Io => ScriptStep::Io(rng.io_burst()),
            },
            Source::Scripted(steps) => steps.pop_front().unwrap_or(ScriptStep::Finish),
        }
    }
}

/// One simulated workload.
#[derive(Debug, Clone)]
pub struct Worker {
    id: WorkerId,
    remaining_burst: Burst,
    source: Source,
    finished: bool,
}

impl Worker {
    /// A worker driven by its own random stream derived from `seed`.
    pub fn new(id: WorkerId, seed: u32) -> Self {
        let mut rng = RandomStream::for_worker(seed, id);
        let remaining_burst = rng.initial_burst();
        Worker {
            id,
            remaining_burst,
            source: Source::Random(rng),
            finished: false,
        }
    }

    pub fn scripted(id: WorkerId, script: &WorkerScript) -> Self {
        Worker {
            id,
            remaining_burst: script.initial_burst,
            source: Source::Scripted(script.after_burst.iter().copied().collect()),
            finished: false,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn remaining_burst(&self) -> Burst {
        self.remaining_burst
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The startup report carrying the initial burst.
    pub fn init_message(&self) -> Message {
        Message::init(self.id, self.remaining_burst)
    }

    /// Execute one tick of CPU work and report the outcome.
    pub fn run_tick(&mut self) -> Message {
        debug_assert!(!self.finished, "worker {} signaled after exit", self.id);
        if self.finished {
            return Message::finished(self.id);
        }

        self.remaining_burst -= 1;
        if self.remaining_burst > 0 {
            return Message::tick_progress(self.id, self.remaining_burst);
        }

        match self.source.next_step() {
            ScriptStep::Finish => {
                self.finished = true;
                self.remaining_burst = 0;
                Message::finished(self.id)
            }
            ScriptStep::Io(next_burst) => {
                self.remaining_burst = next_burst;
                Message::io_request(self.id, next_burst)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use crate::rng::INITIAL_BURST;

    #[test]
    fn test_scripted_countdown() {
        let script = WorkerScript::finish_after(3);
        let mut w = Worker::scripted(WorkerId(0), &script);
        assert_eq!(w.init_message(), Message::init(WorkerId(0), 3));
        assert_eq!(w.run_tick(), Message::tick_progress(WorkerId(0), 2));
        assert_eq!(w.run_tick(), Message::tick_progress(WorkerId(0), 1));
        assert_eq!(w.run_tick(), Message::finished(WorkerId(0)));
        assert!(w.is_finished());
    }

    #[test]
    fn test_scripted_io_then_finish() {
        let script = WorkerScript::finish_after(1).then(ScriptStep::Io(2));
        let mut w = Worker::scripted(WorkerId(4), &script);
        assert_eq!(w.run_tick(), Message::io_request(WorkerId(4), 2));
        assert_eq!(w.remaining_burst(), 2);
        assert_eq!(w.run_tick().kind, MessageKind::TickProgress);
        assert_eq!(w.run_tick().kind, MessageKind::Finished);
    }

    #[test]
    fn test_random_worker_reaches_finish() {
        let mut w = Worker::new(WorkerId(2), 82);
        assert!(INITIAL_BURST.contains(&w.remaining_burst()));
        let mut sent = 0;
        while !w.is_finished() {
            let msg = w.run_tick();
            assert_eq!(msg.worker_id, WorkerId(2));
            sent += 1;
            assert!(sent < 10_000, "worker never finished");
        }
    }

    #[test]
    fn test_random_worker_is_reproducible() {
        let mut a = Worker::new(WorkerId(1), 42);
        let mut b = Worker::new(WorkerId(1), 42);
        assert_eq!(a.init_message(), b.init_message());
        while !a.is_finished() {
            assert_eq!(a.run_tick(), b.run_tick());
        }
        assert!(b.is_finished());
    }

    #[test]
    fn test_script_from_toml() {
        let script: WorkerScript =
            toml::from_str("initial_burst = 4\nafter_burst = [{ io = 2 }, \"finish\"]\n")
                .unwrap();
        assert_eq!(
            script,
            WorkerScript::finish_after(4)
                .then(ScriptStep::Io(2))
                .then(ScriptStep::Finish)
        );
    }
}
