// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Quick statistics over a batch of fetched posts.

use crate::normalize::NormalizedRow;
use crate::text;
use counter::Counter;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// A value and the number of times it occurred.
pub type Tally<T> = (T, usize);

/// Summarizes a batch of [`NormalizedRow`]s.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    records: usize,
    languages: Vec<Tally<Option<String>>>,
    avg_likes: f64,
    avg_retweets: f64,
    top_bigrams: Vec<Tally<String>>,
}

impl Summary {
    /// Number of bigrams reported by [`Summary::top_bigrams()`].
    pub const TOP_BIGRAMS: usize = 5;

    /// Summarizes `rows`.
    pub fn of(rows: &[NormalizedRow]) -> Self {
        let languages = tally(rows.iter().map(|row| row.lang.clone()));
        let avg_likes = mean(rows.iter().map(|row| row.engagement_likes));
        let avg_retweets = mean(rows.iter().map(|row| row.engagement_retweets));
        let top_bigrams = top_bigrams(rows, Self::TOP_BIGRAMS);

        Self {
            records: rows.len(),
            languages,
            avg_likes,
            avg_retweets,
            top_bigrams,
        }
    }

    /// Number of rows summarized.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Number of rows per language, most common first.
    ///
    /// Rows without a language are counted under `None`.
    pub fn languages(&self) -> &[Tally<Option<String>>] {
        &self.languages
    }

    /// Mean number of likes over rows that report likes.
    pub fn avg_likes(&self) -> f64 {
        self.avg_likes
    }

    /// Mean number of retweets over rows that report retweets.
    pub fn avg_retweets(&self) -> f64 {
        self.avg_retweets
    }

    /// The most frequent adjacent word pairs, most common first.
    pub fn top_bigrams(&self) -> &[Tally<String>] {
        &self.top_bigrams
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.records == 0 {
            return write!(f, "No records.");
        }

        let languages = self
            .languages
            .iter()
            .map(|(lang, n)| format!("{}: {n}", lang.as_deref().unwrap_or("null")))
            .join(", ");
        let bigrams = self
            .top_bigrams
            .iter()
            .map(|(bigram, n)| format!("{bigram} ({n})"))
            .join(", ");

        write!(
            f,
            "records={} | lang={{{languages}}} | avg_likes={:.2} | avg_retweets={:.2} | top_bigrams=[{bigrams}]",
            self.records, self.avg_likes, self.avg_retweets,
        )
    }
}

/// The `k` most frequent adjacent word pairs across the text of `rows`.
///
/// Pairs never span two posts. Equally frequent pairs are ordered by
/// when they first appeared.
pub fn top_bigrams(rows: &[NormalizedRow], k: usize) -> Vec<Tally<String>> {
    let bigrams = rows
        .iter()
        .filter_map(|row| row.text.as_deref())
        .flat_map(text::bigrams);
    tally(bigrams).into_iter().take(k).collect()
}

/// Counts `items`, most common first, with ties in first-seen order.
fn tally<T>(items: impl Iterator<Item = T>) -> Vec<Tally<T>>
where
    T: Clone + Eq + Hash,
{
    let mut first_seen: HashMap<T, usize> = HashMap::new();
    let mut counts: Counter<T> = Counter::new();

    for (i, item) in items.enumerate() {
        first_seen.entry(item.clone()).or_insert(i);
        *counts.entry(item).or_insert(0) += 1;
    }

    counts.most_common_tiebreaker(|lhs, rhs| Ord::cmp(&first_seen[lhs], &first_seen[rhs]))
}

/// Arithmetic mean of the values that are present; 0.0 if there are none.
fn mean(values: impl Iterator<Item = Option<u64>>) -> f64 {
    let (sum, n) = values
        .flatten()
        .fold((0.0, 0u64), |(sum, n), value| (sum + value as f64, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}
