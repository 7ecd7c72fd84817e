use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random jitter applied to review intervals.
pub trait Fuzz: Send {
    /// Returns an integer in `[-spread, spread]`.
    fn jitter(&mut self, spread: i64) -> i64;
}

pub struct RandomFuzz {
    rng: StdRng,
}

impl RandomFuzz {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomFuzz {
    fn default() -> Self {
        Self::new()
    }
}

impl Fuzz for RandomFuzz {
    fn jitter(&mut self, spread: i64) -> i64 {
        if spread <= 0 {
            return 0;
        }
        self.rng.gen_range(-spread..=spread)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoFuzz;

impl Fuzz for NoFuzz {
    fn jitter(&mut self, _spread: i64) -> i64 {
        0
    }
}

/// Always jitters by the same offset, clamped into the allowed range.
#[derive(Clone, Copy, Debug)]
pub struct FixedFuzz(pub i64);

impl Fuzz for FixedFuzz {
    fn jitter(&mut self, spread: i64) -> i64 {
        let spread = spread.max(0);
        self.0.clamp(-spread, spread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_stays_in_range() {
        let mut f = RandomFuzz::seeded(7);
        for _ in 0..500 {
            let j = f.jitter(3);
            assert!((-3..=3).contains(&j));
        }
        assert_eq!(f.jitter(0), 0);
    }

    #[test]
    fn fixed_is_clamped() {
        assert_eq!(FixedFuzz(5).jitter(2), 2);
        assert_eq!(FixedFuzz(-5).jitter(2), -2);
        assert_eq!(FixedFuzz(1).jitter(0), 0);
    }
}
