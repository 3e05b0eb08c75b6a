// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Helpful utilities for working with text.

use itertools::Itertools;
use regex::Regex;
use std::sync::LazyLock;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+").expect("invalid URL regex"));

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@#]\S+").expect("invalid tag regex"));

// Latin letters (including Latin-1 accented letters), common CJK
// ideographs, hiragana, katakana and the prolonged sound mark.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z\u{C0}-\u{FF}\u{4E00}-\u{9FA5}\u{3041}-\u{3094}\u{30A1}-\u{30F4}\u{30FC}0-9']+")
        .expect("invalid token regex")
});

/// Collapses every run of whitespace into a single space and trims the ends.
///
/// # Examples
///
/// ```
/// use freescout::text::collapse_whitespace;
/// let query = "  (RIZIN OR UFC)\n    lang:ja\t-is:retweet ";
/// assert_eq!(collapse_whitespace(query), "(RIZIN OR UFC) lang:ja -is:retweet");
/// ```
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Splits a post into lowercase word tokens.
///
/// URLs, @mentions and #hashtags are removed before tokenizing, and
/// punctuation separates tokens. Apostrophes are kept so that
/// contractions remain a single token.
///
/// # Examples
///
/// ```
/// use freescout::text::tokenize;
/// let tokens = tokenize("Can't wait! @friend #MMA https://t.co/xyz");
/// assert_eq!(tokens, vec!["can't", "wait"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let text = URL_RE.replace_all(text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = text.to_lowercase();
    TOKEN_RE
        .find_iter(&text)
        .map(|token| token.as_str().to_string())
        .collect()
}

/// Adjacent token pairs in a post, joined by a single space.
///
/// # Examples
///
/// ```
/// use freescout::text::bigrams;
/// assert_eq!(bigrams("RIZIN vs UFC"), vec!["rizin vs", "vs ufc"]);
/// assert!(bigrams("alone").is_empty());
/// ```
pub fn bigrams(text: &str) -> Vec<String> {
    tokenize(text)
        .iter()
        .tuple_windows()
        .map(|(first, second)| format!("{first} {second}"))
        .collect()
}
