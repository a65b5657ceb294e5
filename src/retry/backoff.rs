//! Exponential backoff between gateway attempts

use std::time::Duration;

use rand::Rng;

/// Exponential backoff configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the second attempt, in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier for exponential growth
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 60_000, // 1 minute
            multiplier: 1.2,
            jitter_factor: 0.0,
        }
    }
}

/// Exponential backoff calculator with optional jitter.
///
/// The first call to [`next_delay`](Self::next_delay) yields the initial
/// delay unchanged, each following call multiplies the previous base delay.
pub struct ExponentialBackoff {
    config: BackoffConfig,
    current_delay_ms: f64,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff with custom configuration
    pub fn with_config(config: BackoffConfig) -> Self {
        let initial = config.initial_delay_ms as f64;
        Self {
            config,
            current_delay_ms: initial,
        }
    }

    /// Get the next delay duration
    pub fn next_delay(&mut self) -> Duration {
        let capped_delay = self.current_delay_ms.min(self.config.max_delay_ms as f64);

        // Jitter is applied to the returned delay only, the growth curve stays exact
        let final_delay = if self.config.jitter_factor > 0.0 && capped_delay > 0.0 {
            let jitter_range = capped_delay * self.config.jitter_factor;
            let jitter = rand::rng().random_range(-jitter_range..jitter_range);
            (capped_delay + jitter).max(0.0)
        } else {
            capped_delay
        };

        self.current_delay_ms *= self.config.multiplier;

        Duration::from_millis(final_delay.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(initial: u64, multiplier: f64) -> BackoffConfig {
        BackoffConfig {
            initial_delay_ms: initial,
            max_delay_ms: 60_000,
            multiplier,
            jitter_factor: 0.0, // No jitter for predictable testing
        }
    }

    #[test]
    fn test_first_delay_is_initial_delay() {
        let mut backoff = ExponentialBackoff::with_config(config(1000, 1.2));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_delays_grow_by_multiplier() {
        let mut backoff = ExponentialBackoff::with_config(config(1000, 1.2));

        let delays: Vec<u128> = (0..4).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![1000, 1200, 1440, 1728]);
    }

    #[test]
    fn test_exponential_backoff_caps_at_max() {
        let config = BackoffConfig {
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
            multiplier: 10.0,
            jitter_factor: 0.0,
        };
        let mut backoff = ExponentialBackoff::with_config(config);

        for _ in 0..5 {
            backoff.next_delay();
        }

        let delay = backoff.next_delay();
        assert_eq!(delay.as_millis(), 5000);
    }

    #[test]
    fn test_jitter_stays_within_range() {
        let config = BackoffConfig {
            initial_delay_ms: 1000,
            max_delay_ms: 60_000,
            multiplier: 1.0,
            jitter_factor: 0.1,
        };
        let mut backoff = ExponentialBackoff::with_config(config);

        for _ in 0..20 {
            let delay = backoff.next_delay().as_millis();
            assert!((900..=1100).contains(&delay), "delay {delay} out of range");
        }
    }
}
