use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::args::{PROBABILITY_SCALE, Probability};

/// Source of the scenario's branching decisions. Production VUs each own an
/// entropy-seeded generator; tests script the outcomes.
pub trait RandomSource: Send + Sync {
    /// `true` with the given probability.
    fn chance(&mut self, probability: Probability) -> bool;
    /// Uniform index in `0..len`; 0 when `len` is 0.
    fn index(&mut self, len: usize) -> usize;
}

#[derive(Debug)]
pub struct ThreadRandom {
    rng: StdRng,
}

impl ThreadRandom {
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for ThreadRandom {
    fn chance(&mut self, probability: Probability) -> bool {
        let roll = self.rng.gen_range(0..PROBABILITY_SCALE);
        roll < probability.per_million()
    }

    fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Replays queued outcomes; an empty queue yields `false` and index 0.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedRandom {
    chances: std::collections::VecDeque<bool>,
    indexes: std::collections::VecDeque<usize>,
    pub(crate) chance_calls: usize,
}

#[cfg(test)]
impl ScriptedRandom {
    pub(crate) fn new(chances: &[bool], indexes: &[usize]) -> Self {
        Self {
            chances: chances.iter().copied().collect(),
            indexes: indexes.iter().copied().collect(),
            chance_calls: 0,
        }
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    fn chance(&mut self, _probability: Probability) -> bool {
        self.chance_calls = self.chance_calls.saturating_add(1);
        self.chances.pop_front().unwrap_or(false)
    }

    fn index(&mut self, len: usize) -> usize {
        let index = self.indexes.pop_front().unwrap_or(0);
        index.min(len.saturating_sub(1))
    }
}
