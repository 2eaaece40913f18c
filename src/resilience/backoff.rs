//! Wait strategies between retry attempts.

use rand::Rng;
use std::time::Duration;

/// Ceiling applied to exponential backoff.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_millis(2_000);

/// Upper bound (exclusive) of the random jitter added to each backoff, in ms.
const JITTER_MS: u64 = 10;

/// Maps an attempt number to the pause before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Constant delay between every attempt.
    Fixed(Duration),
    /// `min(n² + jitter, cap)` milliseconds for the 1-based attempt `n`.
    ExponentialJitter { cap: Duration },
}

impl WaitStrategy {
    pub fn exponential() -> Self {
        WaitStrategy::ExponentialJitter {
            cap: DEFAULT_BACKOFF_CAP,
        }
    }

    /// Delay after the failed 1-based `attempt`, including jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            WaitStrategy::Fixed(delay) => delay,
            WaitStrategy::ExponentialJitter { cap } => {
                let jitter = rand::thread_rng().gen_range(0..JITTER_MS);
                capped(square_ms(attempt).saturating_add(jitter), cap)
            }
        }
    }

    /// Delay without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        match *self {
            WaitStrategy::Fixed(delay) => delay,
            WaitStrategy::ExponentialJitter { cap } => capped(square_ms(attempt), cap),
        }
    }
}

fn square_ms(attempt: u32) -> u64 {
    u64::from(attempt).saturating_pow(2)
}

fn capped(ms: u64, cap: Duration) -> Duration {
    Duration::from_millis(ms).min(cap)
}
