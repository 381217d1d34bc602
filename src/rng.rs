//! Deterministic per-entity random streams.
//!
//! The dispatcher and every worker own an independent stream. Streams are
//! derived from the global run seed with fixed offsets, so a given seed
//! always replays the same burst lengths, coin flips and I/O waits:
//!
//! - dispatcher: `seed + 9999`
//! - worker `i`: `seed + i * 1000 + 7`
//!
//! All seed arithmetic wraps in `u32`.

use std::ops::RangeInclusive;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::types::{Burst, WorkerId};

/// Seed used when none is given on the command line.
pub const DEFAULT_SEED: u32 = 82;

pub const DISPATCHER_SEED_OFFSET: u32 = 9999;
pub const WORKER_SEED_STRIDE: u32 = 1000;
pub const WORKER_SEED_OFFSET: u32 = 7;

/// Length of a worker's first CPU burst.
pub const INITIAL_BURST: RangeInclusive<Burst> = 1..=10;
/// Length of the CPU burst that follows an I/O request.
pub const IO_BURST: RangeInclusive<Burst> = 1..=5;
/// Ticks a worker sleeps after requesting I/O.
pub const IO_WAIT: RangeInclusive<Burst> = 1..=5;

pub fn dispatcher_seed(seed: u32) -> u32 {
    seed.wrapping_add(DISPATCHER_SEED_OFFSET)
}

pub fn worker_seed(seed: u32, id: WorkerId) -> u32 {
    seed.wrapping_add((id.0 as u32).wrapping_mul(WORKER_SEED_STRIDE))
        .wrapping_add(WORKER_SEED_OFFSET)
}

/// What a worker does once its current burst runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinFlip {
    Finish,
    Io,
}

/// A seeded pseudo-random stream owned by exactly one entity.
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: SmallRng,
}

impl RandomStream {
    pub fn new(seed: u32) -> Self {
        RandomStream {
            rng: SmallRng::seed_from_u64(seed as u64),
        }
    }

    pub fn for_dispatcher(seed: u32) -> Self {
        Self::new(dispatcher_seed(seed))
    }

    pub fn for_worker(seed: u32, id: WorkerId) -> Self {
        Self::new(worker_seed(seed, id))
    }

    /// Uniform draw from an inclusive range.
    pub fn draw(&mut self, range: RangeInclusive<Burst>) -> Burst {
        self.rng.random_range(range)
    }

    pub fn initial_burst(&mut self) -> Burst {
        self.draw(INITIAL_BURST)
    }

    pub fn io_burst(&mut self) -> Burst {
        self.draw(IO_BURST)
    }

    pub fn io_wait(&mut self) -> Burst {
        self.draw(IO_WAIT)
    }

    /// Fair coin: zero finishes the workload, one sends it to I/O.
    pub fn coin_flip(&mut self) -> CoinFlip {
        match self.rng.random_range(0..2u32) {
            0 => CoinFlip::Finish,
            _ => CoinFlip::Io,
        }
    }
}
