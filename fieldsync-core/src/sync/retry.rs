// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Retry backoff schedule.

/// Exponential backoff schedule for failed sync attempts.
///
/// Delays double per attempt from `base_delay_secs`, capped at
/// `max_delay_secs`: 1s, 2s, 4s, ... 3600s with the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base_delay_secs: 1,
            max_delay_secs: 3600,
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay in seconds before retry number `attempt` (0-based).
    pub fn backoff_seconds(&self, attempt: u32) -> u64 {
        let multiplier = 1u64 << attempt.min(12);
        self.base_delay_secs
            .saturating_mul(multiplier)
            .min(self.max_delay_secs)
    }

    /// Absolute retry time for an attempt, given the current time.
    pub fn next_retry_time(&self, now: u64, attempt: u32) -> u64 {
        now + self.backoff_seconds(attempt)
    }
}
