use rand::Rng;
use std::str::FromStr;
use std::time::Duration;

/// How long the batch processor waits between replay cycles.
///
/// `Fixed` always waits the configured interval. `Exponential` doubles the
/// wait after every cycle that left batches behind, up to `max_delay`, and
/// drops back to the interval after a clean cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayBackoff {
    #[default]
    Fixed,
    Exponential {
        max_delay: Duration,
        jitter: bool,
    },
}

pub const DEFAULT_MAX_REPLAY_DELAY: Duration = Duration::from_secs(15 * 60);

impl ReplayBackoff {
    pub fn next_delay(&self, interval: Duration, consecutive_failures: u32) -> Duration {
        match *self {
            ReplayBackoff::Fixed => interval,
            ReplayBackoff::Exponential { max_delay, jitter } => {
                if consecutive_failures == 0 {
                    return interval;
                }

                let cap = max_delay.max(interval);
                let multiplier = 2_u32.saturating_pow(consecutive_failures.min(16));
                let delay = interval.saturating_mul(multiplier).min(cap);

                if jitter {
                    apply_jitter(delay).min(cap)
                } else {
                    delay
                }
            }
        }
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    let jitter_factor = rng.random_range(0.5..1.5);
    Duration::from_millis((delay.as_millis() as f64 * jitter_factor) as u64)
}

impl FromStr for ReplayBackoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(ReplayBackoff::Fixed),
            "exponential" => Ok(ReplayBackoff::Exponential {
                max_delay: DEFAULT_MAX_REPLAY_DELAY,
                jitter: true,
            }),
            other => Err(format!(
                "Unknown replay backoff '{other}', expected 'fixed' or 'exponential'"
            )),
        }
    }
}
