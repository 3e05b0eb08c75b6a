// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Environment and configuration utilities.
//!
//! Everything freescout reads or writes lives under a single root
//! directory (the current directory unless `--root` or `$FREESCOUT_ROOT`
//! says otherwise):
//!
//! ```text
//! root/
//! ├── queries.yaml     query key -> search query
//! ├── state.json       quota and rate-limit bookkeeping
//! └── data/
//!     ├── raw/         responses exactly as the API sent them
//!     └── clean/       normalized CSV
//! ```

use crate::auth;
use crate::text::collapse_whitespace;
use log::debug;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest query the free tier accepts, in characters.
pub const MAX_QUERY_LEN: usize = 512;

/// Environment variable holding the pseudonymization salt.
pub const SALT_VAR: &str = "PROJECT_SALT";

/// Salt used when `$PROJECT_SALT` is unset.
///
/// Anyone who knows it can re-identify pseudonymized authors by hashing
/// candidate ids, so set your own when sharing data.
pub const DEFAULT_SALT: &str = "rizin-ufc-2025";

/// Environment variable overriding the API root.
pub const BASE_URL_VAR: &str = "X_API_BASE_URL";

/// Where freescout's files live.
#[derive(Clone, Debug)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Creates a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self { root }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The quota state file.
    pub fn state_path(&self) -> PathBuf {
        self.root.join("state.json")
    }

    /// The query book.
    pub fn queries_path(&self) -> PathBuf {
        self.root.join("queries.yaml")
    }

    /// Directory for raw JSONL responses.
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("data").join("raw")
    }

    /// Directory for normalized CSV files.
    pub fn clean_dir(&self) -> PathBuf {
        self.root.join("data").join("clean")
    }

    /// Creates the output directories if they do not exist yet.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.raw_dir(), self.clean_dir()] {
            fs::create_dir_all(&dir).map_err(|source| Error::Io { path: dir, source })?;
        }
        Ok(())
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Named search queries, loaded from `queries.yaml`.
///
/// The file is a flat mapping of keys to query strings:
///
/// ```yaml
/// rizin_ufc: >
///   (RIZIN OR UFC)
///   lang:ja -is:retweet
/// ```
#[derive(Clone, Debug, Default)]
pub struct QueryBook {
    queries: BTreeMap<String, String>,
}

impl QueryBook {
    /// Reads the query book at `path`.
    ///
    /// An empty file is an empty book.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => Error::MissingQueries(path.to_path_buf()),
            _ => Error::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let queries = if contents.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_yaml::from_str::<Option<BTreeMap<String, String>>>(&contents)
                .map_err(|source| Error::Yaml {
                    path: path.to_path_buf(),
                    source,
                })?
                .unwrap_or_default()
        };
        debug!("loaded {} queries from {}", queries.len(), path.display());
        Ok(Self { queries })
    }

    /// Creates a book from key/query pairs.
    pub fn from_pairs<K, Q>(pairs: impl IntoIterator<Item = (K, Q)>) -> Self
    where
        K: Into<String>,
        Q: Into<String>,
    {
        let queries = pairs
            .into_iter()
            .map(|(key, query)| (key.into(), query.into()))
            .collect();
        Self { queries }
    }

    /// All query keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    /// Looks up the query named `key`, collapses its whitespace, and
    /// checks it is short enough to send.
    pub fn resolve(&self, key: &str) -> Result<String> {
        let query = self
            .queries
            .get(key)
            .ok_or_else(|| Error::UnknownKey(key.to_string()))?;
        let query = collapse_whitespace(query);
        let len = query.chars().count();
        if len > MAX_QUERY_LEN {
            Err(Error::QueryTooLong { len })
        } else {
            Ok(query)
        }
    }
}

/// The pseudonymization salt, from `$PROJECT_SALT` or [`DEFAULT_SALT`].
pub fn salt() -> String {
    env::var(SALT_VAR).unwrap_or_else(|_| String::from(DEFAULT_SALT))
}

/// The API root, from `$X_API_BASE_URL` or the public endpoint.
pub fn base_url() -> String {
    env::var(BASE_URL_VAR).unwrap_or_else(|_| String::from(crate::x::service::DEFAULT_BASE_URL))
}

/// The result of a configuration lookup.
pub type Result<T> = std::result::Result<T, Error>;

/// Something is wrong with freescout's configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// There is no query book.
    #[error("{} not found", .0.display())]
    MissingQueries(PathBuf),

    /// The query book does not define the requested key.
    #[error("query key '{0}' not found in queries.yaml")]
    UnknownKey(String),

    /// The resolved query is longer than the API accepts.
    #[error("query too long ({len} chars); the free tier allows at most {MAX_QUERY_LEN}")]
    QueryTooLong {
        /// Length of the collapsed query, in characters.
        len: usize,
    },

    /// The query book is not a mapping of strings to strings.
    #[error("could not parse {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// A file or directory could not be read or created.
    #[error("I/O error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// No usable bearer token is configured.
    #[error("could not load bearer token: {0}")]
    Auth(#[from] auth::AuthError),
}
