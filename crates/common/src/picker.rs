//! Uniform random choice over dynamically sized option sets

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::{Error, Result};

/// Picks one index out of `count`, drawing from an injectable entropy source.
///
/// Seed it with [`RandomPicker::seeded`] to replay a run.
#[derive(Debug, Clone)]
pub struct RandomPicker<R = StdRng> {
    rng: R,
}

impl RandomPicker<StdRng> {
    /// Picker seeded from the operating system
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Deterministic picker for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Seeded when a seed is given, otherwise from entropy
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> RandomPicker<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Uniform index in `[0, count)`
    pub fn pick(&mut self, count: usize) -> Result<usize> {
        if count == 0 {
            return Err(Error::EmptyOptionSet);
        }
        let index = self.rng.gen_range(0..count);
        trace!("Picked {} of {}", index, count);
        Ok(index)
    }

    /// Pick an element of a slice
    pub fn pick_from<'a, T>(&mut self, items: &'a [T]) -> Result<&'a T> {
        let index = self.pick(items.len())?;
        Ok(&items[index])
    }
}
