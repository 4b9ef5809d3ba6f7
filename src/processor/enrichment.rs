//! Randomness used to fill the enrichment fields.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Picks one of `len` labeled options.
pub trait OptionPicker: Send + Sync + std::fmt::Debug {
    /// Index into a list of `len` options, or `None` when `len` is zero
    fn pick_index(&self, len: usize) -> Option<usize>;
}

/// Pick a value from `options`, falling back to `T::default()` when the
/// list is empty or the picker returns an out-of-range index.
pub fn choose<T: Copy + Default>(picker: &dyn OptionPicker, options: &[T]) -> T {
    picker
        .pick_index(options.len())
        .and_then(|idx| options.get(idx).copied())
        .unwrap_or_default()
}

/// Uniform picker backed by a standard RNG
#[derive(Debug)]
pub struct RandomPicker {
    rng: Mutex<StdRng>,
}

impl RandomPicker {
    /// Seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionPicker for RandomPicker {
    fn pick_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Some(rng.gen_range(0..len))
    }
}

/// Always picks the same index. Intended for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPicker(pub usize);

impl OptionPicker for FixedPicker {
    fn pick_index(&self, len: usize) -> Option<usize> {
        (self.0 < len).then_some(self.0)
    }
}
