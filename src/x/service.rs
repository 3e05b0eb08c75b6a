// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! HTTPS connector for the X API v2.
//!
//! Service structures in this module provide a low-level way to interact
//! with the two recent-search endpoints available on the free tier,
//! returning raw response bodies. Parsing is left to
//! [`XClient`](crate::x::client::XClient).

use crate::auth::Auth;
use crate::http::{HTTPClientFactory, HTTPError, HTTPResult, RetryPolicy};
use clap::ValueEnum;
use log::{debug, trace, warn};
use reqwest::{Client, header};
use std::fmt;

/// Default root of the X API v2.
pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com/2";

/// Post fields requested with every search.
const TWEET_FIELDS: &str = "created_at,lang,public_metrics,conversation_id,author_id";

/// Author fields requested with every search.
const USER_FIELDS: &str = "username,name,public_metrics";

/// Width of the buckets returned by a counts request.
#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum Granularity {
    /// One bucket per hour.
    #[default]
    Hour,

    /// One bucket per day.
    Day,
}

impl Granularity {
    /// The value the API expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service for reading recent posts.
///
/// Using this trait, clients can implement different ways of connecting
/// to the X API, such as an actual connector for production code, an
/// offline generator for trying the tool out, and a canned connector for
/// testing purposes.
pub trait Service {
    /// Retrieves post volume for `query`, bucketed by `granularity`, and
    /// returns the raw JSON body.
    fn counts_recent(
        &self,
        query: &str,
        granularity: Granularity,
    ) -> impl Future<Output = HTTPResult<String>> + Send;

    /// Retrieves up to `max_results` recent posts matching `query`, with
    /// their authors expanded, and returns the raw JSON body.
    fn search_recent(
        &self,
        query: &str,
        max_results: u32,
    ) -> impl Future<Output = HTTPResult<String>> + Send;
}

/// A service that contacts the X API directly.
#[derive(Debug)]
pub struct XService {
    client: Client,
    auth: Auth,
    base_url: String,
    retry_policy: RetryPolicy,
}

impl XService {
    /// Creates a new service authenticating with `auth` against the API
    /// rooted at `base_url`.
    pub fn new(auth: Auth, base_url: impl Into<String>) -> HTTPResult<Self> {
        let client = HTTPClientFactory::default().create()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            auth,
            base_url,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Replaces the default retry policy.
    pub fn retry_policy(self, retry_policy: RetryPolicy) -> Self {
        Self {
            retry_policy,
            ..self
        }
    }

    fn uri(&self, endpoint: &str) -> String {
        format!("{}/tweets/{endpoint}/recent", self.base_url)
    }

    fn counts_params(query: &str, granularity: Granularity) -> Vec<(&'static str, String)> {
        vec![
            ("query", query.to_string()),
            ("granularity", granularity.to_string()),
        ]
    }

    fn search_params(query: &str, max_results: u32) -> Vec<(&'static str, String)> {
        vec![
            ("query", query.to_string()),
            ("max_results", max_results.to_string()),
            ("tweet.fields", TWEET_FIELDS.to_string()),
            ("expansions", String::from("author_id")),
            ("user.fields", USER_FIELDS.to_string()),
        ]
    }

    /// Sends a GET request, retrying transient failures according to the
    /// retry policy, and returns the raw body.
    async fn get(&self, uri: &str, params: &[(&'static str, String)]) -> HTTPResult<String> {
        let mut attempt = 0;
        loop {
            match self.get_once(uri, params).await {
                Err(err) if err.is_transient() && attempt < self.retry_policy.max_retries => {
                    attempt += 1;
                    let delay = self.retry_policy.delay(attempt, &err);
                    warn!(
                        "{err}; retrying in {}ms ({attempt}/{})",
                        delay.as_millis(),
                        self.retry_policy.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn get_once(&self, uri: &str, params: &[(&'static str, String)]) -> HTTPResult<String> {
        debug!("GET {uri}");
        trace!("params: {params:?}");

        let resp = self
            .client
            .get(uri)
            .query(params)
            .bearer_auth(self.auth.bearer_token())
            .send()
            .await?;

        if !resp.status().is_success() {
            Err(HTTPError::from_status(resp.status(), resp.headers()))
        } else {
            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .ok_or(HTTPError::MissingContentType)?
                .to_str()?;
            if !content_type.starts_with("application/json") {
                Err(HTTPError::UnexpectedContentType(content_type.to_string()))
            } else {
                Ok(resp.text().await?)
            }
        }
    }
}

impl Service for XService {
    async fn counts_recent(&self, query: &str, granularity: Granularity) -> HTTPResult<String> {
        let uri = self.uri("counts");
        self.get(&uri, &Self::counts_params(query, granularity)).await
    }

    async fn search_recent(&self, query: &str, max_results: u32) -> HTTPResult<String> {
        let uri = self.uri("search");
        self.get(&uri, &Self::search_params(query, max_results)).await
    }
}
