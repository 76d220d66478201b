use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_INTERVAL_MILLIS: u64 = 1_000;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
pub const MAX_BACKOFF_MILLIS: u64 = 4 * 60 * 60 * 1_000;
pub const RANDOM_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub interval_millis: u64,
    pub backoff_factor: f64,
    /// Upper bound applied after jitter.
    pub max_millis: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            interval_millis: DEFAULT_INTERVAL_MILLIS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_millis: MAX_BACKOFF_MILLIS,
        }
    }
}

impl BackoffConfig {
    pub fn new(interval_millis: u64, max_millis: u64) -> Self {
        Self {
            interval_millis,
            max_millis,
            ..Default::default()
        }
    }

    /// Delay before attempt number `backoff_count` (zero based), with jitter.
    pub fn delay(&self, backoff_count: u32) -> Duration {
        Duration::from_millis(calculate_backoff_with_rng(
            backoff_count,
            *self,
            &mut rand::thread_rng(),
        ))
    }
}

fn calculate_backoff_with_rng<R: Rng + ?Sized>(
    backoff_count: u32,
    config: BackoffConfig,
    rng: &mut R,
) -> u64 {
    let exponent = backoff_count.min(32) as i32;
    let base = (config.interval_millis as f64) * config.backoff_factor.powi(exponent);
    let jitter = RANDOM_FACTOR * base * rng.gen_range(-1.0..=1.0);
    let value = (base + jitter)
        .round()
        .clamp(0.0, config.max_millis.min(MAX_BACKOFF_MILLIS) as f64);
    value as u64
}
