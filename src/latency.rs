//! Latency model
//!
//! A condition-aware delay is `round(base(protocol) * scale(condition))`
//! plus a jitter in `[0, JITTER_BOUND_MS)`. Randomness comes from a
//! [`JitterSource`] so callers can substitute a fixed value in tests.

use std::time::Duration;

use rand::Rng;

use crate::params::{Condition, Protocol};

/// Exclusive upper bound of the jitter added to a configured delay
pub const JITTER_BOUND_MS: u64 = 20;

/// Base delay for HTTP/3
pub const HTTP3_BASE_DELAY_MS: u64 = 25;

/// Base delay for HTTP/2 and anything unrecognized
pub const HTTP2_BASE_DELAY_MS: u64 = 60;

/// Base delay before the condition scale is applied
#[must_use]
pub fn base_delay_ms(protocol: Protocol) -> u64 {
    match protocol {
        Protocol::Http3 => HTTP3_BASE_DELAY_MS,
        Protocol::Http2 => HTTP2_BASE_DELAY_MS,
    }
}

/// Condition scale in tenths (`7` = 0.7x)
fn scale_tenths(condition: Condition) -> u64 {
    match condition {
        Condition::FiveG => 7,
        Condition::Slow3g => 30,
        Condition::Wifi => 10,
    }
}

/// Multiplier applied to the base delay
#[must_use]
pub fn condition_scale(condition: Condition) -> f64 {
    scale_tenths(condition) as f64 / 10.0
}

/// Deterministic part of the simulated latency, rounded half-up
#[must_use]
pub fn configured_delay_ms(protocol: Protocol, condition: Condition) -> u64 {
    (base_delay_ms(protocol) * scale_tenths(condition) + 5) / 10
}

/// Source of per-request jitter
pub trait JitterSource: Send + Sync {
    /// Draw a jitter value in `[0, JITTER_BOUND_MS)`
    fn jitter_ms(&self) -> u64;
}

/// Uniform jitter drawn from the calling thread's RNG
///
/// Each runtime worker has its own generator, so concurrent requests never
/// contend on a shared lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn jitter_ms(&self) -> u64 {
        rand::thread_rng().gen_range(0..JITTER_BOUND_MS)
    }
}

/// Constant jitter, for reproducible runs and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedJitter(u64);

impl FixedJitter {
    /// Create a fixed jitter source
    ///
    /// # Panics
    ///
    /// Panics if `jitter_ms` is not below [`JITTER_BOUND_MS`]
    #[must_use]
    pub fn new(jitter_ms: u64) -> Self {
        assert!(
            jitter_ms < JITTER_BOUND_MS,
            "jitter must be < {JITTER_BOUND_MS}ms"
        );
        Self(jitter_ms)
    }
}

impl JitterSource for FixedJitter {
    fn jitter_ms(&self) -> u64 {
        self.0
    }
}

/// Outcome of one latency computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyResult {
    /// Deterministic component
    pub configured_delay_ms: u64,
    /// Random component
    pub jitter_ms: u64,
}

impl LatencyResult {
    /// Total delay to apply
    #[must_use]
    pub fn measured_latency_ms(&self) -> u64 {
        self.configured_delay_ms + self.jitter_ms
    }

    /// Total delay as a `Duration`
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.measured_latency_ms())
    }
}

/// Computes condition-aware latencies
pub struct LatencyModel {
    jitter: Box<dyn JitterSource>,
}

impl LatencyModel {
    /// Create a model with the given jitter source
    #[must_use]
    pub fn new(jitter: impl JitterSource + 'static) -> Self {
        Self {
            jitter: Box::new(jitter),
        }
    }

    /// Compute the latency for one request
    #[must_use]
    pub fn compute(&self, protocol: Protocol, condition: Condition) -> LatencyResult {
        let jitter_ms = self.jitter.jitter_ms();
        debug_assert!(jitter_ms < JITTER_BOUND_MS);

        LatencyResult {
            configured_delay_ms: configured_delay_ms(protocol, condition),
            jitter_ms,
        }
    }
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self::new(ThreadRngJitter)
    }
}

/// Fixed delays of the endpoints that bypass the condition model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedDelay {
    /// Stylesheet resource
    Css,
    /// Script resource
    Js,
    /// Image resource
    Image,
    /// Slow API
    SlowApi,
    /// Legacy fast API
    FastLegacyApi,
}

impl FixedDelay {
    /// Delay in milliseconds
    #[must_use]
    pub fn millis(self) -> u64 {
        match self {
            Self::Css => 50,
            Self::Js => 80,
            Self::Image => 120,
            Self::SlowApi => 2000,
            Self::FastLegacyApi => 30,
        }
    }

    /// Delay as a `Duration`
    #[must_use]
    pub fn duration(self) -> Duration {
        Duration::from_millis(self.millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_delay_table() {
        assert_eq!(configured_delay_ms(Protocol::Http3, Condition::FiveG), 18);
        assert_eq!(configured_delay_ms(Protocol::Http2, Condition::Slow3g), 180);
        assert_eq!(configured_delay_ms(Protocol::Http3, Condition::Wifi), 25);
        assert_eq!(configured_delay_ms(Protocol::Http2, Condition::Wifi), 60);
        assert_eq!(configured_delay_ms(Protocol::Http2, Condition::FiveG), 42);
        assert_eq!(configured_delay_ms(Protocol::Http3, Condition::Slow3g), 75);
    }

    #[test]
    fn test_configured_delay_matches_float_rounding() {
        for protocol in [Protocol::Http2, Protocol::Http3] {
            for condition in [Condition::Wifi, Condition::FiveG, Condition::Slow3g] {
                let expected =
                    (base_delay_ms(protocol) as f64 * condition_scale(condition)).round();
                assert_eq!(configured_delay_ms(protocol, condition), expected as u64);
            }
        }
    }

    #[test]
    fn test_fixed_jitter() {
        let model = LatencyModel::new(FixedJitter::new(7));
        let result = model.compute(Protocol::Http3, Condition::FiveG);

        assert_eq!(result.configured_delay_ms, 18);
        assert_eq!(result.jitter_ms, 7);
        assert_eq!(result.measured_latency_ms(), 25);
        assert_eq!(result.duration(), Duration::from_millis(25));
    }

    #[test]
    fn test_thread_rng_jitter_bounds() {
        let model = LatencyModel::default();

        for _ in 0..1000 {
            let result = model.compute(Protocol::Http2, Condition::Wifi);
            assert_eq!(result.configured_delay_ms, 60);
            assert!(result.jitter_ms < JITTER_BOUND_MS);
        }
    }

    #[test]
    fn test_jitter_varies() {
        let jitter = ThreadRngJitter;
        let first = jitter.jitter_ms();
        assert!((0..200).any(|_| jitter.jitter_ms() != first));
    }

    #[test]
    #[should_panic(expected = "jitter must be < 20ms")]
    fn test_fixed_jitter_out_of_range() {
        let _ = FixedJitter::new(20);
    }

    #[test]
    fn test_fixed_delays() {
        assert_eq!(FixedDelay::Css.millis(), 50);
        assert_eq!(FixedDelay::Js.millis(), 80);
        assert_eq!(FixedDelay::Image.millis(), 120);
        assert_eq!(FixedDelay::SlowApi.duration(), Duration::from_secs(2));
        assert_eq!(FixedDelay::FastLegacyApi.millis(), 30);
    }
}
