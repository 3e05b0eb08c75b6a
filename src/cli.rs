// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Drives the command-line program.

use crate::auth::{Auth, BEARER_TOKEN_VAR};
use crate::clock::SystemClock;
use crate::conf::{self, Layout};
use crate::harvest::{self, Harvester, Outcome};
use crate::http::HTTPError;
use crate::state::{self, ResetScope, StateStore};
use crate::view::Viewable;
use crate::x::{Granularity, OfflineService, Service, XService};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use log::debug;
use std::path::PathBuf;
use thiserror::Error;

/// Program configuration.
#[derive(Debug, Parser)]
#[command(version)]
#[command(about = "Scouts and fetches recent posts from the X API without overrunning the free tier", long_about = None
)]
pub struct Config {
    #[command(flatten)]
    verbosity: Verbosity,

    /// Directory holding queries.yaml, state.json and data/
    #[arg(long, env = "FREESCOUT_ROOT", default_value = ".", global = true)]
    root: PathBuf,

    /// Generate synthetic responses instead of calling the API
    #[arg(long, default_value_t = false, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

impl Config {
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.root)
    }
}

#[derive(Debug, PartialEq, Subcommand)]
enum Command {
    /// Show quota usage and rate-limit timestamps
    Status,

    /// Reset quota counters
    Reset {
        /// Clear only the monthly counter, or everything
        #[arg(long, value_enum, default_value_t = ResetScope::Monthly)]
        what: ResetScope,
    },

    /// Show post volume for a query over the last week
    Scout {
        /// Key of the query in queries.yaml
        #[arg(long)]
        query_key: String,

        /// Bucket width
        #[arg(long, value_enum, default_value_t = Granularity::Hour)]
        granularity: Granularity,
    },

    /// Fetch recent posts for a query
    Fetch {
        /// Key of the query in queries.yaml
        #[arg(long)]
        query_key: String,

        /// Posts to request; clamped to 10..=100
        #[arg(long, default_value_t = 10)]
        max_results: u32,

        /// Replace author ids with salted hashes and drop names
        #[arg(long, default_value_t = false)]
        anonymize: bool,
    },
}

/// Runs the command-line program and returns its exit status.
pub async fn run(config: Config) -> i32 {
    match Runner::new(config).run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            err.exit_code()
        }
    }
}

/// Runs the command-line program.
#[derive(Debug)]
pub struct Runner {
    config: Config,
    layout: Layout,
}

impl Runner {
    /// Create a new program runner using the given `config`.
    pub fn new(config: Config) -> Runner {
        let layout = config.layout();
        Self { config, layout }
    }

    /// Run the command-line program using its stored configuration options,
    /// returning the exit status.
    pub async fn run(&self) -> Result<i32, Error> {
        match &self.config.command {
            Command::Status => self.run_status(),
            Command::Reset { what } => self.run_reset(*what),
            Command::Scout { .. } | Command::Fetch { .. } => {
                if self.config.offline {
                    debug!("using offline service");
                    self.run_harvest(OfflineService::new(SystemClock)).await
                } else {
                    let auth = Auth::from_env(BEARER_TOKEN_VAR).map_err(conf::Error::from)?;
                    let service = XService::new(auth, conf::base_url())?;
                    self.run_harvest(service).await
                }
            }
        }
    }

    fn store(&self) -> StateStore<SystemClock> {
        StateStore::new(self.layout.state_path(), SystemClock)
    }

    fn run_status(&self) -> Result<i32, Error> {
        let state = self.store().load()?;
        println!("{}", state.view(&SystemClock));
        Ok(0)
    }

    fn run_reset(&self, scope: ResetScope) -> Result<i32, Error> {
        self.store().reset(scope)?;
        let what = match scope {
            ResetScope::Monthly => "monthly",
            ResetScope::All => "all",
        };
        println!("Reset done: {what}");
        Ok(0)
    }

    async fn run_harvest<S: Service>(&self, service: S) -> Result<i32, Error> {
        let harvester =
            Harvester::new(service, SystemClock, self.layout.clone()).salt(conf::salt());

        match &self.config.command {
            Command::Scout {
                query_key,
                granularity,
            } => {
                println!("SCOUT '{query_key}'...");
                let outcome = harvester.scout(query_key, *granularity).await?;
                Ok(report(outcome))
            }
            Command::Fetch {
                query_key,
                max_results,
                anonymize,
            } => {
                println!("FETCH '{query_key}' (max_results={max_results})...");
                let outcome = harvester.fetch(query_key, *max_results, *anonymize).await?;
                Ok(report(outcome))
            }
            Command::Status | Command::Reset { .. } => Ok(0),
        }
    }
}

fn report<T: Viewable>(outcome: Outcome<T>) -> i32 {
    match outcome {
        Outcome::Done(report) => {
            println!("{}", report.view(&SystemClock));
            0
        }
        Outcome::Denied(denial) => {
            println!("{}", denial.view(&SystemClock));
            denial.kind().exit_code()
        }
    }
}

/// The command-line program failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] conf::Error),

    #[error("could not create HTTP client: {0}")]
    Http(#[from] HTTPError),

    #[error(transparent)]
    State(#[from] state::Error),

    #[error(transparent)]
    Harvest(#[from] harvest::Error),
}

impl Error {
    /// The process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Harvest(err) => err.exit_code(),
            _ => 1,
        }
    }
}
