// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

use crate::clock::{Clock, DateTime, Utc};
use crate::http::{HTTPError, HTTPResult};
use crate::normalize::{Anonymizer, NormalizedRow, SOURCE_PLATFORM, normalize};
use crate::x::service::{Granularity, Service};
use crate::x::thing::SearchResponse;
use reqwest::StatusCode;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn do_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn load_data(file: &str) -> String {
    fs::read_to_string(format!("tests/data/{file}.json")).expect("could not find test data")
}

pub fn load_search(file: &str) -> SearchResponse {
    serde_json::from_str(&load_data(file)).expect("could not parse test data")
}

/// The canned search results, normalized without anonymization.
pub fn load_rows() -> Vec<NormalizedRow> {
    normalize(
        &load_search("search_recent"),
        "rizin_ufc",
        &Anonymizer::disabled(),
        &FrozenClock::default().now(),
    )
}

/// A bare row with only engagement counters set.
pub fn row(likes: Option<u64>, retweets: Option<u64>) -> NormalizedRow {
    NormalizedRow {
        url: None,
        post_id: None,
        created_at: None,
        lang: None,
        text: None,
        author_id: None,
        author_username: None,
        author_name: None,
        author_followers: None,
        engagement_likes: likes,
        engagement_retweets: retweets,
        engagement_replies: None,
        engagement_quotes: None,
        engagement_total: likes.unwrap_or(0) + retweets.unwrap_or(0),
        conversation_id: None,
        query_key: String::from("key"),
        fetched_at: FrozenClock::default().now().to_rfc3339(),
        source_platform: SOURCE_PLATFORM,
    }
}

/// Serves canned responses from `tests/data` and counts how often it
/// was asked to.
#[derive(Debug)]
pub struct TestService<'a> {
    counts: &'a str,
    search: &'a str,
    calls: AtomicUsize,
}

impl<'a> TestService<'a> {
    pub fn new(counts: &'a str, search: &'a str) -> Self {
        Self {
            counts,
            search,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn serve(&self, file: &str) -> HTTPResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(load_data(file))
    }
}

impl Default for TestService<'_> {
    fn default() -> Self {
        Self::new("counts_hour", "search_recent")
    }
}

impl Service for TestService<'_> {
    async fn counts_recent(&self, _query: &str, _granularity: Granularity) -> HTTPResult<String> {
        self.serve(self.counts)
    }

    async fn search_recent(&self, _query: &str, _max_results: u32) -> HTTPResult<String> {
        self.serve(self.search)
    }
}

/// Fails every request with the same status.
#[derive(Debug)]
pub struct FailingService {
    status: StatusCode,
    calls: AtomicUsize,
}

impl FailingService {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> HTTPResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HTTPError::Api {
            status: self.status,
            retry_after: None,
            rate_limit_reset: None,
        })
    }
}

impl Service for FailingService {
    async fn counts_recent(&self, _query: &str, _granularity: Granularity) -> HTTPResult<String> {
        self.fail()
    }

    async fn search_recent(&self, _query: &str, _max_results: u32) -> HTTPResult<String> {
        self.fail()
    }
}

#[derive(Clone, Debug)]
pub struct FrozenClock {
    datetime: DateTime<Utc>,
}

impl FrozenClock {
    pub fn new(datetime: DateTime<Utc>) -> Self {
        FrozenClock { datetime }
    }
}

impl Default for FrozenClock {
    fn default() -> Self {
        let datetime = DateTime::parse_from_rfc3339("2025-05-23T10:13:00-07:00")
            .expect("invalid date supplied")
            .with_timezone(&Utc);
        Self::new(datetime)
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        self.datetime
    }
}
