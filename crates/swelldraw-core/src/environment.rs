//! Clock and randomness collaborators.
//!
//! Element construction, mutation bookkeeping and scene nonces never reach for
//! global time or randomness directly. They go through an [`Environment`] so
//! that tests can pin both down.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};
#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};

/// Timestamp reported by [`FixedClock::default`].
pub const DETERMINISTIC_TIMESTAMP: i64 = 1;

/// Source of `updated` timestamps (epoch milliseconds).
pub trait Clock {
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// A clock frozen at a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Default for FixedClock {
    fn default() -> Self {
        Self(DETERMINISTIC_TIMESTAMP)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

/// Source of seeds, version nonces and scene nonces.
pub trait RandomSource {
    fn next_u32(&mut self) -> u32;

    /// Random integer in `[0, 2^31)`.
    fn random_integer(&mut self) -> u32 {
        self.next_u32() >> 1
    }
}

/// Deterministic splitmix32 generator.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    state: u32,
}

impl SeededRandom {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seed from the wall clock mixed with a process-wide counter, so two
    /// generators created in the same millisecond still diverge.
    pub fn from_entropy() -> Self {
        static INSTANCE_COUNTER: AtomicU32 = AtomicU32::new(1);

        let counter = INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.subsec_nanos())
            .unwrap_or(0);
        Self::new(nanos ^ counter.wrapping_mul(0x9E37_79B9))
    }
}

impl RandomSource for SeededRandom {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x9E37_79B9);
        let mut x = self.state;
        x ^= x >> 16;
        x = x.wrapping_mul(0x85EB_CA6B);
        x ^= x >> 13;
        x = x.wrapping_mul(0xC2B2_AE35);
        x ^= x >> 16;
        x
    }
}

/// Clock plus random source, owned by a scene.
pub struct Environment {
    clock: Box<dyn Clock>,
    random: Box<dyn RandomSource>,
}

impl Environment {
    pub fn new(clock: impl Clock + 'static, random: impl RandomSource + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            random: Box::new(random),
        }
    }

    /// Wall clock and an entropy-seeded generator.
    pub fn system() -> Self {
        Self::new(SystemClock, SeededRandom::from_entropy())
    }

    /// Fixed timestamps and a seeded generator; every run is reproducible.
    pub fn deterministic(seed: u32) -> Self {
        Self::new(FixedClock::default(), SeededRandom::new(seed))
    }

    /// Current `updated` timestamp.
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub fn random_integer(&mut self) -> u32 {
        self.random.random_integer()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_random_is_reproducible() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_random_integer_stays_below_2_pow_31() {
        let mut rng = SeededRandom::new(7);
        for _ in 0..1000 {
            assert!(rng.random_integer() < (1 << 31));
        }
    }

    #[test]
    fn test_deterministic_environment_uses_fixed_clock() {
        let env = Environment::deterministic(1);
        assert_eq!(env.now(), DETERMINISTIC_TIMESTAMP);
    }

    #[test]
    fn test_entropy_generators_diverge() {
        let mut a = SeededRandom::from_entropy();
        let mut b = SeededRandom::from_entropy();
        assert_ne!(a.next_u32(), b.next_u32());
    }
}
