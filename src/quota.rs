//! Prediction request quota
//!
//! The server grants each account a small number of predictions per
//! window, by account type. The client mirrors the policy so it can show
//! the dashboard and skip calls that would certainly be refused.

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::api::types::{QuotaInfo, UserType};

/// Remaining share at or below which the quota is shown as low.
const LOW_QUOTA_RATIO: f64 = 0.3;

/// Quota rules for an account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaPolicy {
    pub requests_per_window: i32,
    pub window_minutes: i64,
}

impl QuotaPolicy {
    pub fn for_user_type(user_type: UserType) -> Self {
        match user_type {
            UserType::Student => Self {
                requests_per_window: 3,
                window_minutes: 5,
            },
            UserType::Company => Self {
                requests_per_window: 10,
                window_minutes: 5,
            },
        }
    }

    /// Whole minutes left before the window resets, never negative.
    pub fn minutes_until_reset(&self, last_reset: NaiveDateTime, now: NaiveDateTime) -> i64 {
        let elapsed = (now - last_reset).num_minutes();
        (self.window_minutes - elapsed).max(0)
    }

    pub fn window_elapsed(&self, last_reset: NaiveDateTime, now: NaiveDateTime) -> bool {
        now - last_reset >= TimeDelta::minutes(self.window_minutes)
    }
}

/// Result of checking the quota before a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum QuotaCheck {
    Allowed { remaining: i32 },
    Denied { minutes_until_reset: i64 },
}

impl QuotaCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

impl QuotaInfo {
    /// Remaining share of the window in percent (0 when the total is 0).
    pub fn percentage_remaining(&self) -> f64 {
        if self.total_quota <= 0 {
            return 0.0;
        }
        (self.remaining_requests as f64 / self.total_quota as f64) * 100.0
    }

    pub fn is_low(&self) -> bool {
        self.remaining_requests as f64 <= self.total_quota as f64 * LOW_QUOTA_RATIO
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_requests <= 0
    }
}

/// Decide locally whether a prediction is worth sending.
///
/// A window that has already elapsed at `now` is treated as reset to the
/// account's full allowance, matching what the server does on the next call.
pub fn precheck(info: &QuotaInfo, policy: &QuotaPolicy, now: NaiveDateTime) -> QuotaCheck {
    if policy.window_elapsed(info.last_reset_time, now) {
        return QuotaCheck::Allowed {
            remaining: policy.requests_per_window,
        };
    }

    if info.is_exhausted() {
        return QuotaCheck::Denied {
            minutes_until_reset: policy.minutes_until_reset(info.last_reset_time, now),
        };
    }

    QuotaCheck::Allowed {
        remaining: info.remaining_requests,
    }
}
