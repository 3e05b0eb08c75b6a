// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Persisted quota and rate-limit bookkeeping.
//!
//! The free tier allows one counts request and one search request every
//! fifteen minutes, and 100 search results per calendar month. freescout
//! tracks its own usage in a small JSON file so that it never sends a
//! request the API would reject (or, worse, bill against next month's
//! allowance).
//!
//! A [`StateStore`] is the only way to read or write that file. Every
//! [`StateStore::load()`] reconciles the stored month with the current
//! UTC month first, so a counter from a previous month is never used.
//!
//! # Limitations
//!
//! There is no file locking. Two freescout processes running at the same
//! time can both pass their guards and both spend budget; only run one
//! invocation at a time.

use crate::clock::{Clock, DateTime, Utc};
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Usage counters for the current month.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct QuotaState {
    /// The month `monthly_count` applies to, as `YYYY-MM`.
    pub month: String,

    /// Number of search results fetched since the start of `month`.
    pub monthly_count: u32,

    /// When the last counts request succeeded.
    pub last_counts_ts: Option<DateTime<Utc>>,

    /// When the last search request succeeded.
    pub last_search_ts: Option<DateTime<Utc>>,
}

impl QuotaState {
    /// A zero-valued state for the given month.
    pub fn new(month: impl Into<String>) -> Self {
        let month = month.into();
        Self {
            month,
            ..Self::default()
        }
    }

    /// Rolls the state forward to `month` if it refers to another month.
    ///
    /// Returns true if the state changed and needs to be saved.
    pub fn reconcile(&mut self, month: &str) -> bool {
        if self.month == month {
            false
        } else {
            self.month = month.to_string();
            self.monthly_count = 0;
            true
        }
    }
}

/// Which counters to clear with [`StateStore::reset()`].
#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum ResetScope {
    /// Only the monthly result counter.
    #[default]
    Monthly,

    /// The monthly counter and both rate-limit timestamps.
    All,
}

/// Loads and saves [`QuotaState`] to a single JSON file.
#[derive(Debug)]
pub struct StateStore<C: Clock> {
    path: PathBuf,
    clock: C,
}

impl<C: Clock> StateStore<C> {
    /// Creates a store backed by the file at `path`.
    ///
    /// Nothing is read or written until the state is first loaded.
    pub fn new(path: impl Into<PathBuf>, clock: C) -> Self {
        let path = path.into();
        Self { path, clock }
    }

    /// Path to the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The clock used to determine the current month and timestamps.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Reads the current state.
    ///
    /// A fresh zero-valued state is written on first use. If the stored
    /// month is not the current month, the monthly counter is zeroed and
    /// the reset is written back before the state is returned.
    pub fn load(&self) -> Result<QuotaState> {
        let month = self.clock.month();

        if !self.path.exists() {
            debug!("no state at {}, creating one", self.path.display());
            let state = QuotaState::new(month);
            self.save(&state)?;
            return Ok(state);
        }

        let data = fs::read_to_string(&self.path).map_err(|err| Error::Read {
            path: self.path.clone(),
            source: err,
        })?;
        let mut state: QuotaState = serde_json::from_str(&data).map_err(|err| Error::Parse {
            path: self.path.clone(),
            source: err,
        })?;

        if state.reconcile(&month) {
            debug!("month rolled over to {month}, monthly count reset");
            self.save(&state)?;
        }

        Ok(state)
    }

    /// Overwrites the state file with `state`.
    ///
    /// The state is written to a temporary sibling file which is then
    /// renamed over the original, so readers never see a partial file.
    pub fn save(&self, state: &QuotaState) -> Result<()> {
        let data = serde_json::to_string_pretty(state)?;
        let temp_path = self.path.with_extension("json.tmp");

        fs::write(&temp_path, data).map_err(|err| Error::Write {
            path: temp_path.clone(),
            source: err,
        })?;
        fs::rename(&temp_path, &self.path).map_err(|err| Error::Write {
            path: self.path.clone(),
            source: err,
        })?;

        Ok(())
    }

    /// Records that a counts request just succeeded.
    pub fn mark_counts_called(&self) -> Result<QuotaState> {
        self.update(|state, now| state.last_counts_ts = Some(now))
    }

    /// Records that a search request just succeeded.
    pub fn mark_search_called(&self) -> Result<QuotaState> {
        self.update(|state, now| state.last_search_ts = Some(now))
    }

    /// Adds `n` delivered search results to the monthly counter.
    pub fn bump_monthly_count(&self, n: u32) -> Result<QuotaState> {
        self.update(|state, _| state.monthly_count = state.monthly_count.saturating_add(n))
    }

    /// Clears counters according to `scope`.
    pub fn reset(&self, scope: ResetScope) -> Result<QuotaState> {
        match scope {
            ResetScope::Monthly => self.update(|state, _| state.monthly_count = 0),
            ResetScope::All => {
                let state = QuotaState::new(self.clock.month());
                self.save(&state)?;
                Ok(state)
            }
        }
    }

    fn update<F>(&self, f: F) -> Result<QuotaState>
    where
        F: FnOnce(&mut QuotaState, DateTime<Utc>),
    {
        let mut state = self.load()?;
        f(&mut state, self.clock.now());
        self.save(&state)?;
        Ok(state)
    }
}

/// The result of a state operation.
pub type Result<T> = std::result::Result<T, Error>;

/// An error reading or writing the state file.
#[derive(Debug, Error)]
pub enum Error {
    /// The state file exists but could not be read.
    #[error("Could not read state from {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The state file could not be written.
    #[error("Could not write state to {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The state file does not contain a valid state object.
    #[error("Could not parse state in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The state could not be serialized.
    #[error("Could not serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}
