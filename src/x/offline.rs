// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! A deterministic stand-in for the X API.
//!
//! [`OfflineService`] fabricates responses shaped exactly like the real
//! endpoints' responses, so the whole pipeline (guards, artifacts,
//! normalization, summaries) can be exercised without credentials or
//! network access. The data is synthetic and only depends on the query,
//! the request parameters and the current time.

use crate::clock::{Clock, DateTime, TimeDelta, Utc};
use crate::http::HTTPResult;
use crate::x::service::{Granularity, Service};
use chrono::{DurationRound, SecondsFormat};
use serde_json::{Value, json};

/// Synthetic authors, cycled through by search results.
const AUTHORS: [(&str, &str, &str, u64, u64); 4] = [
    ("1001", "rizin_fan", "RIZIN Fan", 1540, 3200),
    ("1002", "ufc_addict", "UFC Addict", 2890, 5400),
    ("1003", "combat_journal", "Combat Journal", 870, 1220),
    ("1004", "mma_polyglot", "MMA Polyglot", 640, 980),
];

const LANGS: [&str; 5] = ["en", "es", "pt", "fr", "ja"];

/// A service that never leaves the machine.
#[derive(Debug, Default)]
pub struct OfflineService<C: Clock> {
    clock: C,
}

impl<C: Clock> OfflineService<C> {
    /// Creates an offline service that timestamps its data with `clock`.
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn counts(&self, query: &str, granularity: Granularity) -> Value {
        let (steps, step) = match granularity {
            Granularity::Hour => (24, TimeDelta::hours(1)),
            Granularity::Day => (7, TimeDelta::days(1)),
        };
        let anchor = self
            .clock
            .now()
            .duration_trunc(TimeDelta::hours(1))
            .unwrap_or_else(|_| self.clock.now());

        let buckets: Vec<Value> = (0..steps)
            .map(|i| {
                let start = anchor - step * (steps - i);
                let end = start + step;
                json!({
                    "start": timestamp(&start),
                    "end": timestamp(&end),
                    "tweet_count": 12 + (i * 3) % 9,
                })
            })
            .collect();
        let total: i32 = (0..steps).map(|i| 12 + (i * 3) % 9).sum();

        json!({
            "data": buckets,
            "meta": {
                "query": query,
                "granularity": granularity.as_str(),
                "total_tweet_count": total,
            },
        })
    }

    fn search(&self, query: &str, max_results: u32) -> Value {
        let n = max_results.clamp(1, 100) as usize;
        let now = self.clock.now();
        let excerpt: String = query.chars().take(60).collect();

        let posts: Vec<Value> = (0..n)
            .map(|i| {
                let (author_id, ..) = AUTHORS[i % AUTHORS.len()];
                let id = (now.timestamp() - i as i64).to_string();
                let created_at = now - TimeDelta::minutes(3 * i as i64);
                json!({
                    "id": id,
                    "author_id": author_id,
                    "created_at": timestamp(&created_at),
                    "lang": LANGS[i % LANGS.len()],
                    "text": format!("[{}] Sample post referencing query {excerpt} (RIZIN vs UFC).", i + 1),
                    "public_metrics": {
                        "retweet_count": (i * 2) % 7,
                        "reply_count": (i * 3) % 5,
                        "like_count": 5 + (i * 4) % 20,
                        "quote_count": i % 3,
                    },
                    "conversation_id": id,
                })
            })
            .collect();

        let users: Vec<Value> = AUTHORS
            .iter()
            .take(n.min(AUTHORS.len()))
            .map(|(id, username, name, followers, tweets)| {
                json!({
                    "id": id,
                    "username": username,
                    "name": name,
                    "public_metrics": {"followers_count": followers, "tweet_count": tweets},
                })
            })
            .collect();

        let newest_id = posts.first().map(|post| post["id"].clone());
        let oldest_id = posts.last().map(|post| post["id"].clone());

        json!({
            "data": posts,
            "includes": {"users": users},
            "meta": {
                "result_count": n,
                "newest_id": newest_id,
                "oldest_id": oldest_id,
            },
        })
    }
}

impl<C: Clock + Sync> Service for OfflineService<C> {
    async fn counts_recent(&self, query: &str, granularity: Granularity) -> HTTPResult<String> {
        Ok(self.counts(query, granularity).to_string())
    }

    async fn search_recent(&self, query: &str, max_results: u32) -> HTTPResult<String> {
        Ok(self.search(query, max_results).to_string())
    }
}

fn timestamp(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}
