//! Random sources
//!
//! Everything random in the core (tier draws, payout multipliers, reel
//! symbols, churn frames, fabricated feed events) flows through a
//! [`RandomSource`], so tests can swap the entropy for a scripted sequence
//! and reproduce any outcome exactly.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard};

/// Uniform random draws in `[0, 1)`
pub trait RandomSource: Send {
    /// Next uniform draw in `[0, 1)`
    fn next_f64(&mut self) -> f64;

    /// Next raw 64 bits
    fn next_u64(&mut self) -> u64;

    /// Uniform index into a collection of `len` items (`len > 0`)
    fn index(&mut self, len: usize) -> usize {
        let scaled = (self.next_f64() * len as f64).floor() as usize;
        scaled.min(len.saturating_sub(1))
    }

    /// Bernoulli trial with probability `p`
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// `StdRng`-backed source, seeded or drawn from OS entropy
pub struct SeededRandom {
    inner: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.gen::<u64>()
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
///
/// Values are clamped into `[0, 1)`.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    pub fn new(values: Vec<f64>) -> Self {
        let values = if values.is_empty() { vec![0.0] } else { values };
        Self {
            values: values
                .into_iter()
                .map(|v| if v.is_finite() { v.clamp(0.0, 1.0 - f64::EPSILON) } else { 0.0 })
                .collect(),
            cursor: 0,
        }
    }

    /// Number of draws consumed so far
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }

    fn next_u64(&mut self) -> u64 {
        (self.next_f64() * u64::MAX as f64) as u64
    }
}

/// A random source shared between the components of one session
#[derive(Clone)]
pub struct SharedRandom {
    inner: Arc<Mutex<Box<dyn RandomSource>>>,
}

impl SharedRandom {
    pub fn new(source: impl RandomSource + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(source))),
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(SeededRandom::from_entropy())
    }

    /// Exclusive access for a batch of draws
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn RandomSource>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
