// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Draws viewable objects into a terminal window.

use crate::clock::{Clock, DateTime, Utc};
use crate::guard::{MONTHLY_LIMIT, RATE_WINDOW_SECS};
use crate::harvest::{CountsReport, Denial, FetchReport};
use crate::state::QuotaState;
use indoc::formatdoc;

/// Marks an item that can be converted into a string for display on a terminal.
pub trait Viewable {
    /// Converts the item into a string for display on a terminal.
    fn view<C: Clock>(&self, clock: &C) -> String;
}

impl Viewable for QuotaState {
    fn view<C: Clock>(&self, clock: &C) -> String {
        formatdoc! {"
            month: {}
            monthly_count: {} / {MONTHLY_LIMIT}
            last_counts_ts: {}
            last_search_ts: {}",
            self.month,
            self.monthly_count,
            timestamp(self.last_counts_ts.as_ref(), clock),
            timestamp(self.last_search_ts.as_ref(), clock),
        }
    }
}

fn timestamp<C: Clock>(ts: Option<&DateTime<Utc>>, clock: &C) -> String {
    match ts {
        None => String::from("never"),
        Some(ts) => {
            let wait = RATE_WINDOW_SECS - clock.seconds_since(Some(ts));
            if wait > 0 {
                format!("{} (next call in {wait}s)", ts.to_rfc3339())
            } else {
                ts.to_rfc3339()
            }
        }
    }
}

impl Viewable for CountsReport {
    fn view<C: Clock>(&self, _: &C) -> String {
        format!(
            "7d_total={} | last24h={} | saved={}",
            self.total,
            self.last_24,
            self.raw_path.display()
        )
    }
}

impl Viewable for FetchReport {
    fn view<C: Clock>(&self, _: &C) -> String {
        formatdoc! {"
            {}
            raw: {}
            csv: {}",
            self.summary,
            self.raw_path.display(),
            self.clean_path.display(),
        }
    }
}

impl Viewable for Denial {
    fn view<C: Clock>(&self, _: &C) -> String {
        self.to_string()
    }
}
