use crate::config::PollConfig;
use std::time::Duration;

/// Interval schedule between status checks
///
/// Starts at the configured initial interval and grows by `multiplier` up to
/// the ceiling. A server-supplied hint always replaces the computed value and
/// does not advance the schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    pub fn new(config: &PollConfig) -> Self {
        Self {
            next: config.initial_interval,
            max: config.max_interval,
            multiplier: config.multiplier.max(1.0),
        }
    }

    pub fn next_delay(&mut self, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint;
        }

        let current = self.next.min(self.max);
        self.next = Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max)
            .min(self.max);
        current
    }
}
