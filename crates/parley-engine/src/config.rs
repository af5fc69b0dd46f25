//! Orchestrator tuning knobs.
//!
//! Defaults are normative: the reveal budget of 20 attempts spaced 15
//! seconds apart bounds the worst-case wait at roughly five minutes, which
//! matches the human timescale of the external gateway. Tests shrink the
//! delays, not the semantics.

use serde::{Deserialize, Serialize};

/// Bounded-retry policy for the decrypt step of the reveal protocol.
///
/// The delay is constant, not exponential: the bottleneck is an external
/// gateway working on a human timescale, not a load-shedding condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRetryPolicy {
    /// Maximum decryption attempts before giving up.
    pub max_attempts: u32,
    /// Fixed delay between attempts, milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for RevealRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            retry_delay_ms: 15_000,
        }
    }
}

/// Exponential back-off schedule for the SDK readiness poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapPolicy {
    /// First inter-probe delay, milliseconds; doubles per probe.
    pub probe_base_delay_ms: u64,
    /// Ceiling on any single inter-probe delay, milliseconds.
    pub probe_delay_cap_ms: u64,
    /// Maximum readiness probes before the bootstrap fails.
    pub max_probe_attempts: u32,
}

impl Default for BootstrapPolicy {
    fn default() -> Self {
        // 100ms, 200ms, ... capped at 5s: twelve probes, ~40s ceiling.
        Self {
            probe_base_delay_ms: 100,
            probe_delay_cap_ms: 5_000,
            max_probe_attempts: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reveal_budget_is_five_minutes() {
        let policy = RevealRetryPolicy::default();
        let worst_case_wait = u64::from(policy.max_attempts - 1) * policy.retry_delay_ms;
        assert_eq!(worst_case_wait, 285_000);
    }

    #[test]
    fn default_probe_schedule_stays_under_a_minute() {
        let policy = BootstrapPolicy::default();
        let mut delay = policy.probe_base_delay_ms;
        let mut total = 0u64;
        for _ in 1..policy.max_probe_attempts {
            total += delay;
            delay = (delay * 2).min(policy.probe_delay_cap_ms);
        }
        assert!(total < 60_000, "probe schedule too slow: {total}ms");
    }
}
