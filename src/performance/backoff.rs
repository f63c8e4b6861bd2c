//! Exponential backoff bounded by a total elapsed time

use std::time::Duration;

const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_MULTIPLIER: f64 = 1.5;
const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);

/// Backoff schedule for a single logical request.
///
/// Each call to [`ExponentialBackoff::next_delay`] yields a randomized delay
/// around the current interval and grows the interval by the multiplier.
/// Once sleeping again would overrun `max_elapsed_time`, it returns `None`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    current_interval: Duration,
    multiplier: f64,
    randomization_factor: f64,
    max_interval: Duration,
    max_elapsed_time: Duration,
}

impl ExponentialBackoff {
    pub fn new(max_elapsed_time: Duration) -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            current_interval: DEFAULT_INITIAL_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            max_interval: DEFAULT_MAX_INTERVAL,
            max_elapsed_time,
        }
    }

    /// Override the first interval (mostly useful in tests)
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self.current_interval = interval;
        self
    }

    pub fn with_randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn reset(&mut self) {
        self.current_interval = self.initial_interval;
    }

    /// Delay before the next attempt, given the time spent so far.
    pub fn next_delay(&mut self, elapsed: Duration) -> Option<Duration> {
        let delay = randomize(self.current_interval, self.randomization_factor, rand::random::<f64>());

        if elapsed.saturating_add(delay) > self.max_elapsed_time {
            return None;
        }

        let grown = self.current_interval.as_secs_f64() * self.multiplier;
        self.current_interval = if grown >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(grown)
        };

        Some(delay)
    }
}

/// Pick a delay uniformly in `[interval * (1 - factor), interval * (1 + factor)]`
/// using `sample` in `[0, 1)`.
fn randomize(interval: Duration, factor: f64, sample: f64) -> Duration {
    let base = interval.as_secs_f64();
    let delta = factor * base;
    let min = base - delta;
    let max = base + delta;
    Duration::from_secs_f64(min + sample * (max - min))
}
