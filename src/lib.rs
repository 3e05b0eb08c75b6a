// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! freescout is a command-line tool for sampling recent posts from the
//! X API on its free tier. It can show how many posts match a query over
//! the last week, and fetch a page of matching posts into raw JSONL and
//! flat CSV files ready for analysis.
//!
//! The free tier is stingy: one counts request and one search request
//! every fifteen minutes, and 100 search results a month. freescout keeps
//! track of its own usage in `state.json` and refuses to send a request
//! the API would reject.
//!
//! # Examples
//!
//! Queries live in a `queries.yaml` file in the working directory (or the
//! directory named by `--root` or `$FREESCOUT_ROOT`):
//!
//! ```yaml
//! rizin_ufc: >
//!   (RIZIN OR UFC) lang:ja -is:retweet
//! ```
//!
//! Show hourly post volume for a query:
//!
//! ```bash
//! freescout scout --query-key rizin_ufc
//! ```
//!
//! Show daily post volume instead:
//!
//! ```bash
//! freescout scout --query-key rizin_ufc --granularity day
//! ```
//!
//! Fetch up to 25 recent posts, hashing author ids and dropping names:
//!
//! ```bash
//! freescout fetch --query-key rizin_ufc --max-results 25 --anonymize
//! ```
//!
//! Show how much of this month's quota has been used:
//!
//! ```bash
//! freescout status
//! ```
//!
//! Clear the monthly counter, or every counter and timestamp:
//!
//! ```bash
//! freescout reset
//! freescout reset --what all
//! ```
//!
//! Try any command without credentials or network access by adding
//! `--offline`, which generates synthetic responses:
//!
//! ```bash
//! freescout --offline fetch --query-key rizin_ufc
//! ```
//!
//! Get usage and help for the tool:
//!
//! ```bash
//! freescout --help
//! ```
//!
//! # Exit Status
//!
//! | Status | Meaning                                          |
//! |--------|--------------------------------------------------|
//! | 0      | Success                                          |
//! | 1      | Configuration, state or file error               |
//! | 2      | Denied: a request was made too recently          |
//! | 3      | Denied: the request would exceed monthly quota   |
//! | 4      | The API request failed                           |
//!
//! # X API Setup
//!
//! To make live requests you need an app in the [X developer portal]:
//!
//! 1. Create a project and app on the free tier.
//! 2. Generate a bearer token for the app.
//! 3. Store the token in your shell's `$X_BEARER_TOKEN` environment
//!    variable:
//!
//!    ```bash
//!    $ export X_BEARER_TOKEN='copied bearer token'
//!    ```
//!
//! `$X_API_BASE_URL` points freescout at a different API root, which is
//! mostly useful for testing against a local mock.
//!
//! # Pseudonymization
//!
//! `--anonymize` replaces author ids with a SHA-256 hash of the id and a
//! salt, read from `$PROJECT_SALT`. This is pseudonymization, not
//! anonymization: anyone with the salt can hash candidate ids and match
//! them. The default salt is public, so set your own before sharing data.
//!
//! # License
//!
//! freescout is licensed under the terms of the [Apache License 2.0]. Please
//! see the LICENSE file accompanying this source code or visit the previous
//! link for more information on licensing.
//!
//! [Apache License 2.0]: https://www.apache.org/licenses/LICENSE-2.0
//! [X developer portal]: https://developer.x.com/en/portal/dashboard

pub mod archive;
pub mod auth;
pub mod cli;
pub mod clock;
pub mod conf;
pub mod guard;
pub mod harvest;
pub mod http;
pub mod normalize;
pub mod state;
pub mod summary;
pub mod text;
pub mod view;
pub mod x;

#[cfg(test)]
mod test_utils;
