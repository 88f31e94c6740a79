//! Row resampling with replacement.
//!
//! Every random draw in the crate goes through an explicit generator
//! owned by a [`Resampler`] or a [`SeedStream`]; nothing touches a
//! process-wide RNG, so independent runs can proceed concurrently.

use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::{BootstrapError, Stage};

/// Counter-based RNG seed generation using SplitMix64.
///
/// This is a stateless PRF that generates deterministic, well-distributed
/// seeds from a base seed and counter. The engine uses it to derive redraw
/// seeds for a failed replication without consuming the main seed stream.
///
/// # Arguments
///
/// * `base_seed` - Base random seed
/// * `counter` - Iteration counter (0, 1, 2, ...)
#[inline]
pub fn counter_rng_seed(base_seed: u64, counter: u64) -> u64 {
    // SplitMix64: https://xoshiro.di.unimi.it/splitmix64.c
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Draws index multisets of size N from `0..N`.
///
/// The generator state advances with every draw and is never reset, so two
/// consecutive resamples from one `Resampler` differ while two resamplers
/// built from the same seed agree draw for draw.
#[derive(Debug, Clone)]
pub struct Resampler {
    rng: Xoshiro256PlusPlus,
}

impl Resampler {
    /// Create a resampler from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Draw `n` indices uniformly with replacement from `0..n`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` at stage `Resampling` if `n == 0`.
    pub fn resample(&mut self, n: usize) -> Result<Vec<usize>, BootstrapError> {
        let mut out = vec![0; n];
        self.resample_into(&mut out)?;
        Ok(out)
    }

    /// Fill `out` with indices drawn from `0..out.len()`.
    ///
    /// Writes into a caller buffer so hot loops can reuse one allocation.
    ///
    /// # Errors
    ///
    /// `InvalidInput` at stage `Resampling` if `out` is empty.
    pub fn resample_into(&mut self, out: &mut [usize]) -> Result<(), BootstrapError> {
        let n = out.len();
        if n == 0 {
            return Err(BootstrapError::invalid(
                Stage::Resampling,
                "cannot resample an empty dataset",
            ));
        }

        for slot in out.iter_mut() {
            *slot = self.rng.random_range(0..n);
        }
        Ok(())
    }
}

/// Sequential source of per-replication seeds.
///
/// The engine draws all R seeds from the stream before dispatching any
/// work, so which replication gets which seed does not depend on the order
/// in which workers finish.
#[derive(Debug, Clone)]
pub struct SeedStream {
    rng: Xoshiro256PlusPlus,
}

impl SeedStream {
    /// Start a stream from a base seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Next seed in the stream.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// The next `count` seeds, in stream order.
    pub fn take(&mut self, count: usize) -> Vec<u64> {
        (0..count).map(|_| self.next_seed()).collect()
    }
}
