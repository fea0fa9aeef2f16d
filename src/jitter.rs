//! Jitter for computed backoff delays.
//!
//! - `None`: deterministic delays; keeps the backoff curve monotonic. The default.
//! - `Full`: uniform in `[0, delay]`, spreads a synchronized fleet the most.
//! - `Equal`: uniform in `[delay/2, delay]`, keeps a floor while adding randomness.
//!
//! Jitter never widens a delay past the curve value it was given, so the curve's ceiling
//! still bounds the result. Server-supplied `Retry-After` hints are never jittered.
//!
//! RNG: `rand`'s thread-local RNG by default; deterministic RNGs can be injected via
//! [`Jitter::apply_with_rng`].

use rand::{rng, Rng};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Jitter strategy for randomizing backoff delays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Jitter {
    #[default]
    None,
    Full,
    Equal,
}

impl Jitter {
    pub fn full() -> Self {
        Jitter::Full
    }

    pub fn equal() -> Self {
        Jitter::Equal
    }

    /// Apply jitter using the thread-local RNG.
    pub fn apply(&self, delay: Duration) -> Duration {
        if *self == Jitter::None {
            return delay;
        }
        self.apply_with_rng(delay, &mut rng())
    }

    /// Apply jitter with a caller-supplied RNG.
    pub fn apply_with_rng<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let floor = match self {
            Jitter::None => return delay,
            Jitter::Full => 0,
            Jitter::Equal => millis / 2,
        };
        if millis == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.random_range(floor..=millis))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Jitter::None => "none",
            Jitter::Full => "full",
            Jitter::Equal => "equal",
        }
    }
}

impl fmt::Display for Jitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a jitter name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown jitter strategy: {0} (expected none, full, or equal)")]
pub struct UnknownJitter(pub String);

impl FromStr for Jitter {
    type Err = UnknownJitter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Jitter::None),
            "full" => Ok(Jitter::Full),
            "equal" => Ok(Jitter::Equal),
            _ => Err(UnknownJitter(s.to_string())),
        }
    }
}
