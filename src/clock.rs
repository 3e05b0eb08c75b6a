// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! All things time-related.

pub use chrono::{DateTime, TimeDelta, Utc};

/// Tells time and returns the time.
///
/// Generally you will want to retrieve time using [`SystemClock`],
/// but in tests you may want to implement a `Clock` with a fixed time.
pub trait Clock {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;

    /// The current calendar month in UTC, formatted as `YYYY-MM`.
    ///
    /// Quota counters are keyed by this value.
    fn month(&self) -> String {
        month_of(&self.now())
    }

    /// Whole seconds elapsed since `then`.
    ///
    /// `None` is treated as "infinitely long ago" and yields [`i64::MAX`].
    /// A timestamp in the future yields a negative number.
    fn seconds_since(&self, then: Option<&DateTime<Utc>>) -> i64 {
        match then {
            Some(then) => (self.now() - *then).num_seconds(),
            None => i64::MAX,
        }
    }
}

/// Interacts with the system clock to get the current time.
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Formats the UTC month of `datetime` as `YYYY-MM`.
///
/// # Examples
///
/// ```
/// use chrono::DateTime;
/// use freescout::clock::month_of;
/// let datetime = DateTime::parse_from_rfc3339("2025-02-28T23:59:59-08:00").unwrap();
/// assert_eq!(month_of(&datetime.to_utc()), "2025-03");
/// ```
pub fn month_of(datetime: &DateTime<Utc>) -> String {
    datetime.format("%Y-%m").to_string()
}

/// A compact timestamp suitable for artifact file names (`YYYYmmddHHMMSS`).
pub fn file_tag(datetime: &DateTime<Utc>) -> String {
    datetime.format("%Y%m%d%H%M%S").to_string()
}
