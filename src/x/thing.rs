// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Records returned by the X API v2 recent endpoints.
//!
//! Any field may be missing and unknown fields are ignored; the API
//! omits fields it was not asked for. An explicit `null` reads the same
//! as a missing field.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Parses a JSON value into one of the response records.
pub(crate) fn parse<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, Error> {
    Ok(serde_json::from_value(value)?)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Response from `GET /2/tweets/counts/recent`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CountsResponse {
    #[serde(deserialize_with = "null_as_default")]
    data: Vec<CountBucket>,
    #[serde(deserialize_with = "null_as_default")]
    meta: CountsMeta,
}

/// Number of posts in one time bucket.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CountBucket {
    start: Option<String>,
    end: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    tweet_count: u64,
}

/// Metadata accompanying a [`CountsResponse`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CountsMeta {
    query: Option<String>,
    granularity: Option<String>,
    total_tweet_count: Option<u64>,
}

impl CountsResponse {
    /// The time buckets, oldest first.
    pub fn buckets(&self) -> &[CountBucket] {
        &self.data
    }

    /// Response metadata.
    pub fn meta(&self) -> &CountsMeta {
        &self.meta
    }

    /// Sum of posts across every bucket.
    pub fn total(&self) -> u64 {
        self.data.iter().map(|bucket| bucket.tweet_count).sum()
    }

    /// Sum of posts across the `n` most recent buckets.
    pub fn recent_total(&self, n: usize) -> u64 {
        let skip = self.data.len().saturating_sub(n);
        self.data[skip..].iter().map(|bucket| bucket.tweet_count).sum()
    }
}

impl CountBucket {
    /// Start of the bucket, as reported by the API.
    pub fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    /// End of the bucket, as reported by the API.
    pub fn end(&self) -> Option<&str> {
        self.end.as_deref()
    }

    /// Number of posts in the bucket.
    pub fn tweet_count(&self) -> u64 {
        self.tweet_count
    }
}

impl CountsMeta {
    /// The query the counts were computed for.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// `hour` or `day`.
    pub fn granularity(&self) -> Option<&str> {
        self.granularity.as_deref()
    }

    /// Total reported by the API itself.
    pub fn total_tweet_count(&self) -> Option<u64> {
        self.total_tweet_count
    }
}

/// Response from `GET /2/tweets/search/recent`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchResponse {
    #[serde(deserialize_with = "null_as_default")]
    data: Vec<Post>,
    #[serde(deserialize_with = "null_as_default")]
    includes: Includes,
    #[serde(deserialize_with = "null_as_default")]
    meta: SearchMeta,
}

/// Objects expanded alongside the primary posts.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Includes {
    #[serde(deserialize_with = "null_as_default")]
    users: Vec<Author>,
}

/// Metadata accompanying a [`SearchResponse`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchMeta {
    result_count: Option<u32>,
    newest_id: Option<String>,
    oldest_id: Option<String>,
}

/// A post (tweet).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Post {
    pub id: Option<String>,
    pub author_id: Option<String>,
    pub created_at: Option<String>,
    pub lang: Option<String>,
    pub text: Option<String>,
    pub conversation_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub public_metrics: PostMetrics,
}

/// Engagement counters for a [`Post`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostMetrics {
    pub like_count: Option<u64>,
    pub retweet_count: Option<u64>,
    pub reply_count: Option<u64>,
    pub quote_count: Option<u64>,
}

/// The account that wrote a [`Post`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Author {
    pub id: Option<String>,
    pub username: Option<String>,
    pub name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub public_metrics: AuthorMetrics,
}

/// Public counters for an [`Author`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthorMetrics {
    pub followers_count: Option<u64>,
    pub tweet_count: Option<u64>,
}

impl SearchResponse {
    /// The matching posts, in the order the API returned them.
    pub fn posts(&self) -> &[Post] {
        &self.data
    }

    /// Authors of the posts, as expanded by the API.
    pub fn authors(&self) -> &[Author] {
        &self.includes.users
    }

    /// Response metadata.
    pub fn meta(&self) -> &SearchMeta {
        &self.meta
    }
}

impl SearchMeta {
    /// Number of posts the API says it returned.
    pub fn result_count(&self) -> Option<u32> {
        self.result_count
    }

    /// ID of the most recent post in the response.
    pub fn newest_id(&self) -> Option<&str> {
        self.newest_id.as_deref()
    }

    /// ID of the oldest post in the response.
    pub fn oldest_id(&self) -> Option<&str> {
        self.oldest_id.as_deref()
    }
}

/// An error parsing an API response.
#[derive(Debug, Error)]
#[error("could not parse API response: {0}")]
pub struct Error(#[from] serde_json::Error);
