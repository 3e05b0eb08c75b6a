// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Flattens search responses into analytics rows.
//!
//! Each post in a [`SearchResponse`] becomes exactly one [`NormalizedRow`],
//! in the same order the API returned them. The post's author is joined
//! in from the response's expanded users.
//!
//! # Pseudonymization
//!
//! When rows are anonymized, the author ID is replaced by
//! `hex(sha256(id + salt))` and the username and display name are
//! dropped. This is _pseudonymization_, not encryption: the hash is
//! deterministic, so anyone who knows the salt and has a list of
//! candidate account IDs can recover which account wrote a post. Use a
//! private salt (`$PROJECT_SALT`) and do not publish it alongside the
//! data.

use crate::clock::{DateTime, Utc};
use crate::x::thing::{Author, Post, SearchResponse};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// The platform every row is sourced from.
pub const SOURCE_PLATFORM: &str = "x";

/// One post, flattened.
///
/// Fields are declared in the column order used by the clean CSV
/// artifact; `source_platform` is an extra column trailing the preferred
/// ones.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub url: Option<String>,
    pub post_id: Option<String>,
    pub created_at: Option<String>,
    pub lang: Option<String>,
    pub text: Option<String>,
    pub author_id: Option<String>,
    pub author_username: Option<String>,
    pub author_name: Option<String>,
    pub author_followers: Option<u64>,
    pub engagement_likes: Option<u64>,
    pub engagement_retweets: Option<u64>,
    pub engagement_replies: Option<u64>,
    pub engagement_quotes: Option<u64>,
    pub engagement_total: u64,
    pub conversation_id: Option<String>,
    pub query_key: String,
    pub fetched_at: String,
    pub source_platform: &'static str,
}

/// Column names of [`NormalizedRow`], in order.
pub const COLUMNS: [&str; 18] = [
    "url",
    "post_id",
    "created_at",
    "lang",
    "text",
    "author_id",
    "author_username",
    "author_name",
    "author_followers",
    "engagement_likes",
    "engagement_retweets",
    "engagement_replies",
    "engagement_quotes",
    "engagement_total",
    "conversation_id",
    "query_key",
    "fetched_at",
    "source_platform",
];

/// Controls whether author identities are pseudonymized.
#[derive(Clone, Debug, Default)]
pub struct Anonymizer {
    salt: Option<String>,
}

impl Anonymizer {
    /// Keeps author identities as-is.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Pseudonymizes author identities with the given `salt`.
    pub fn with_salt(salt: impl Into<String>) -> Self {
        let salt = Some(salt.into());
        Self { salt }
    }

    /// Returns an enabled anonymizer if `enabled` is true.
    pub fn new(enabled: bool, salt: impl Into<String>) -> Self {
        if enabled {
            Self::with_salt(salt)
        } else {
            Self::disabled()
        }
    }

    /// True if rows will be pseudonymized.
    pub fn is_enabled(&self) -> bool {
        self.salt.is_some()
    }
}

/// Hashes `id` with `salt` into a stable, hex-encoded pseudonym.
///
/// # Examples
///
/// ```
/// use freescout::normalize::pseudonymize;
/// let once = pseudonymize("1001", "pepper");
/// let twice = pseudonymize("1001", "pepper");
/// assert_eq!(once, twice);
/// assert_eq!(once.len(), 64);
/// assert_ne!(once, pseudonymize("1001", "paprika"));
/// ```
pub fn pseudonymize(id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Link to a post on x.com.
///
/// Uses the author's handle when it is known, and the handle-less
/// `/i/web/status/` form otherwise. Returns `None` if the post has no ID.
pub fn permalink(username: Option<&str>, post_id: Option<&str>) -> Option<String> {
    let post_id = post_id?;
    Some(match username {
        Some(username) => format!("https://x.com/{username}/status/{post_id}"),
        None => format!("https://x.com/i/web/status/{post_id}"),
    })
}

/// Flattens every post in `response` into a row.
///
/// `query_key` names the query the posts were fetched for and
/// `fetched_at` is when they were fetched; both are stamped on every row.
pub fn normalize(
    response: &SearchResponse,
    query_key: &str,
    anonymizer: &Anonymizer,
    fetched_at: &DateTime<Utc>,
) -> Vec<NormalizedRow> {
    let authors: HashMap<&str, &Author> = response
        .authors()
        .iter()
        .filter_map(|author| author.id.as_deref().map(|id| (id, author)))
        .collect();
    let fetched_at = fetched_at.to_rfc3339();

    response
        .posts()
        .iter()
        .map(|post| {
            let author = post
                .author_id
                .as_deref()
                .and_then(|id| authors.get(id).copied());
            normalize_post(post, author, query_key, anonymizer, &fetched_at)
        })
        .collect()
}

fn normalize_post(
    post: &Post,
    author: Option<&Author>,
    query_key: &str,
    anonymizer: &Anonymizer,
    fetched_at: &str,
) -> NormalizedRow {
    let metrics = &post.public_metrics;
    let engagement_total: u64 = [
        metrics.like_count,
        metrics.retweet_count,
        metrics.reply_count,
        metrics.quote_count,
    ]
    .iter()
    .flatten()
    .fold(0, |total: u64, count| total.saturating_add(*count));

    let (author_id, author_username, author_name) = match &anonymizer.salt {
        Some(salt) => (
            post.author_id.as_deref().map(|id| pseudonymize(id, salt)),
            None,
            None,
        ),
        None => (
            post.author_id.clone(),
            author.and_then(|author| author.username.clone()),
            author.and_then(|author| author.name.clone()),
        ),
    };

    NormalizedRow {
        url: permalink(author_username.as_deref(), post.id.as_deref()),
        post_id: post.id.clone(),
        created_at: post.created_at.clone(),
        lang: post.lang.clone(),
        text: post.text.clone(),
        author_id,
        author_username,
        author_name,
        author_followers: author.and_then(|author| author.public_metrics.followers_count),
        engagement_likes: metrics.like_count,
        engagement_retweets: metrics.retweet_count,
        engagement_replies: metrics.reply_count,
        engagement_quotes: metrics.quote_count,
        engagement_total,
        conversation_id: post.conversation_id.clone(),
        query_key: query_key.to_string(),
        fetched_at: fetched_at.to_string(),
        source_platform: SOURCE_PLATFORM,
    }
}
