// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Local checks that a planned API call stays within the free tier.
//!
//! Guards only answer "may I call?". They never modify the
//! [`QuotaState`]; recording that a call happened is the job of
//! [`StateStore`](crate::state::StateStore), and only after the call
//! actually succeeded.

use crate::clock::Clock;
use crate::state::QuotaState;
use std::fmt;

/// Minimum number of seconds between two calls to the same endpoint.
pub const RATE_WINDOW_SECS: i64 = 15 * 60;

/// Maximum number of search results per calendar month.
pub const MONTHLY_LIMIT: u32 = 100;

/// Smallest page size accepted by the search endpoint.
pub const MIN_RESULTS: u32 = 10;

/// Largest page size accepted by the search endpoint.
pub const MAX_RESULTS: u32 = 100;

/// The verdict of a guard.
#[derive(Clone, Debug, PartialEq)]
pub struct GuardDecision {
    allowed: bool,
    reason: String,
}

impl GuardDecision {
    /// A decision that lets the call through.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: String::from("ok"),
        }
    }

    /// A decision that blocks the call for the given `reason`.
    pub fn deny(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            allowed: false,
            reason,
        }
    }

    /// True if the call may proceed.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// A human-readable explanation of the decision.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for GuardDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

/// Denies a counts request made less than fifteen minutes after the
/// previous one.
pub fn counts_rate<C: Clock>(state: &QuotaState, clock: &C) -> GuardDecision {
    rate("counts", clock.seconds_since(state.last_counts_ts.as_ref()))
}

/// Denies a search request made less than fifteen minutes after the
/// previous one.
pub fn search_rate<C: Clock>(state: &QuotaState, clock: &C) -> GuardDecision {
    rate("search", clock.seconds_since(state.last_search_ts.as_ref()))
}

/// Denies a search for `requested` results if it could push this month's
/// total past [`MONTHLY_LIMIT`].
///
/// `requested` should already be clamped with [`clamp_max_results()`].
///
/// # Examples
///
/// ```
/// use freescout::guard::monthly_quota;
/// use freescout::state::QuotaState;
///
/// let mut state = QuotaState::new("2025-05");
/// state.monthly_count = 90;
/// assert!(monthly_quota(&state, 10).is_allowed());
/// assert!(!monthly_quota(&state, 11).is_allowed());
/// ```
pub fn monthly_quota(state: &QuotaState, requested: u32) -> GuardDecision {
    let used = state.monthly_count;
    if used.saturating_add(requested) > MONTHLY_LIMIT {
        GuardDecision::deny(format!(
            "quota would be exceeded: used={used}, request={requested}, limit={MONTHLY_LIMIT}"
        ))
    } else {
        GuardDecision::allow()
    }
}

/// Clamps a requested page size into the range the search endpoint accepts.
///
/// # Examples
///
/// ```
/// use freescout::guard::clamp_max_results;
/// assert_eq!(clamp_max_results(0), 10);
/// assert_eq!(clamp_max_results(25), 25);
/// assert_eq!(clamp_max_results(500), 100);
/// ```
pub fn clamp_max_results(requested: u32) -> u32 {
    requested.clamp(MIN_RESULTS, MAX_RESULTS)
}

fn rate(endpoint: &str, elapsed: i64) -> GuardDecision {
    if elapsed < RATE_WINDOW_SECS {
        GuardDecision::deny(format!(
            "{endpoint} rate limit: {elapsed}s since last, need ≥{RATE_WINDOW_SECS}s"
        ))
    } else {
        GuardDecision::allow()
    }
}
