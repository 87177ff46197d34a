//! Injectable source of randomness for tag selection and id generation.

use std::sync::Mutex;

use rand::distributions::{Alphanumeric, Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Random choices made during an attempt.
///
/// Implementations must be callable from any task, so everything takes
/// `&self`.
pub trait RandomnessPolicy: Send + Sync {
    /// Index drawn with probability proportional to its weight.
    /// `None` when `weights` is empty or sums to zero.
    fn weighted_index(&self, weights: &[u32]) -> Option<usize>;

    /// Fair coin.
    fn coin_flip(&self) -> bool;

    /// `len` characters from `[A-Za-z0-9]`.
    fn alphanumeric(&self, len: usize) -> String;

    /// Index in `0..len`, each equally likely. `None` when `len == 0`.
    fn uniform_index(&self, len: usize) -> Option<usize> {
        self.weighted_index(&vec![1; len])
    }
}

fn weighted_with<R: Rng>(rng: &mut R, weights: &[u32]) -> Option<usize> {
    WeightedIndex::<u32>::new(weights).ok().map(|dist| dist.sample(rng))
}

fn alphanumeric_with<R: Rng>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Entropy from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandomness;

impl RandomnessPolicy for ThreadRandomness {
    fn weighted_index(&self, weights: &[u32]) -> Option<usize> {
        weighted_with(&mut rand::thread_rng(), weights)
    }

    fn coin_flip(&self) -> bool {
        rand::thread_rng().gen_bool(0.5)
    }

    fn alphanumeric(&self, len: usize) -> String {
        alphanumeric_with(&mut rand::thread_rng(), len)
    }
}

/// Reproducible sequence from a fixed seed.
#[derive(Debug)]
pub struct SeededRandomness {
    rng: Mutex<StdRng>,
}

impl SeededRandomness {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A poisoned generator is still a valid generator.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut *rng)
    }
}

impl RandomnessPolicy for SeededRandomness {
    fn weighted_index(&self, weights: &[u32]) -> Option<usize> {
        self.with_rng(|rng| weighted_with(rng, weights))
    }

    fn coin_flip(&self) -> bool {
        self.with_rng(|rng| rng.next_u32() & 1 == 1)
    }

    fn alphanumeric(&self, len: usize) -> String {
        self.with_rng(|rng| alphanumeric_with(rng, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_index_empty_is_none() {
        assert_eq!(ThreadRandomness.uniform_index(0), None);
        assert_eq!(ThreadRandomness.weighted_index(&[0, 0]), None);
    }

    #[test]
    fn test_uniform_index_in_range() {
        for _ in 0..100 {
            let i = ThreadRandomness.uniform_index(3).unwrap();
            assert!(i < 3);
        }
    }

    #[test]
    fn test_weighted_index_skips_zero_weights() {
        for _ in 0..100 {
            assert_eq!(ThreadRandomness.weighted_index(&[0, 5, 0]), Some(1));
        }
    }

    #[test]
    fn test_alphanumeric_length_and_charset() {
        let s = ThreadRandomness.alphanumeric(8);
        assert_eq!(s.len(), 8);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = SeededRandomness::new(7);
        let b = SeededRandomness::new(7);
        assert_eq!(a.alphanumeric(16), b.alphanumeric(16));
        assert_eq!(a.coin_flip(), b.coin_flip());
        assert_eq!(a.uniform_index(10), b.uniform_index(10));
    }
}
