use std::num::NonZeroU32;
use std::time::Duration;

use rand::Rng;

/// Share of the delay added as random jitter (1/10).
const JITTER_DIVISOR: u32 = 10;

/// Reconnect schedule for a dropped stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
    /// Reconnects allowed after consecutive unproductive connections;
    /// `None` retries forever.
    pub max_attempts: Option<NonZeroU32>,
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2,
            max_attempts: None,
            jitter: true,
        }
    }
}

/// Exponential backoff state driven by [`ReconnectPolicy`].
#[derive(Debug)]
pub(crate) struct Backoff {
    policy: ReconnectPolicy,
    current: Duration,
    failures: u32,
}

impl Backoff {
    pub(crate) fn new(policy: ReconnectPolicy) -> Self {
        let current = policy.initial_delay.min(policy.max_delay);
        Self {
            policy,
            current,
            failures: 0,
        }
    }

    /// Delay before the next attempt; grows the following one.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.failures = self.failures.saturating_add(1);
        self.current = base
            .checked_mul(self.policy.multiplier.max(1))
            .unwrap_or(self.policy.max_delay)
            .min(self.policy.max_delay);
        if self.policy.jitter {
            base.saturating_add(jitter(base))
        } else {
            base
        }
    }

    /// Back to the initial delay after a productive connection.
    pub(crate) fn reset(&mut self) {
        self.current = self.policy.initial_delay.min(self.policy.max_delay);
        self.failures = 0;
    }

    /// Replaces the initial delay with a server-provided `retry` hint.
    pub(crate) fn set_initial_delay(&mut self, delay: Duration) {
        self.policy.initial_delay = delay;
        if self.failures == 0 {
            self.current = delay.min(self.policy.max_delay);
        }
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.policy
            .max_attempts
            .is_some_and(|max| self.failures >= max.get())
    }

    pub(crate) const fn failures(&self) -> u32 {
        self.failures
    }
}

fn jitter(base: Duration) -> Duration {
    let span = base.checked_div(JITTER_DIVISOR).unwrap_or_default();
    let span_ms = u64::try_from(span.as_millis()).unwrap_or(u64::MAX);
    if span_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=span_ms))
}
