//! Reconnect delays: exponential, capped, jittered. Never gives up.

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub factor: f64,
    /// Relative spread, `0.1` meaning each delay lands within ±10%.
    pub jitter: f64,
}

impl From<&ReconnectConfig> for BackoffPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            initial: config.initial_delay(),
            max: config.max_delay(),
            factor: config.factor,
            jitter: config.jitter,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

/// Delay generator for one connection.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.initial,
            policy,
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Swap the policy, restarting from its initial delay.
    pub fn set_policy(&mut self, policy: BackoffPolicy) {
        *self = Self::new(policy);
    }

    /// Delay before the next attempt; grows the following one.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current.min(self.policy.max);
        self.current = Duration::try_from_secs_f64(base.as_secs_f64() * self.policy.factor)
            .unwrap_or(self.policy.max)
            .min(self.policy.max);
        jittered(base, self.policy.jitter)
    }

    /// Back to the initial delay, after a successful sign-on.
    pub fn reset(&mut self) {
        self.current = self.policy.initial;
    }
}

fn jittered(base: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 || base.is_zero() {
        return base;
    }
    let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
    Duration::try_from_secs_f64(base.as_secs_f64() * factor).unwrap_or(base)
}
