// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Runs guarded requests against the X API.
//!
//! A [`Harvester`] ties together the query book, the quota state, the
//! guards, the API client and the artifact writers. Every operation
//! follows the same order: resolve the query, consult the guards against
//! freshly loaded state, make the request, and only then record that the
//! request happened. A request is recorded as soon as the API answers
//! with a success status, even if the body cannot be parsed. A denied
//! request, or one the API rejected, leaves the state file exactly as it
//! was.

use crate::archive;
use crate::clock::{Clock, file_tag};
use crate::conf::{self, Layout, QueryBook};
use crate::guard::{self, GuardDecision};
use crate::normalize::{Anonymizer, normalize};
use crate::state::{self, StateStore};
use crate::summary::Summary;
use crate::x::client::{self, Fetched, XClient};
use crate::x::service::{Granularity, Service};
use crate::x::thing::{CountsResponse, SearchResponse};
use log::{debug, info};
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which limit turned a request down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DenialKind {
    /// A counts request was made too recently.
    CountsRate,

    /// A search request was made too recently.
    SearchRate,

    /// A search would exceed the monthly row quota.
    MonthlyQuota,
}

impl DenialKind {
    /// The process exit status for this kind of denial.
    pub fn exit_code(&self) -> i32 {
        match self {
            DenialKind::CountsRate | DenialKind::SearchRate => 2,
            DenialKind::MonthlyQuota => 3,
        }
    }
}

/// A request that was never sent because a guard refused it.
#[derive(Clone, Debug, PartialEq)]
pub struct Denial {
    kind: DenialKind,
    reason: String,
}

impl Denial {
    fn new(kind: DenialKind, decision: GuardDecision) -> Self {
        let reason = decision.reason().to_string();
        Self { kind, reason }
    }

    /// The limit that refused the request.
    pub fn kind(&self) -> DenialKind {
        self.kind
    }

    /// A human-readable explanation.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// What happened to a guarded request.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The request was sent and its results were saved.
    Done(T),

    /// A guard refused the request; nothing was sent or saved.
    Denied(Denial),
}

/// The result of a counts request.
#[derive(Debug)]
pub struct CountsReport {
    /// Where the raw response was saved.
    pub raw_path: PathBuf,

    /// Posts across every bucket.
    pub total: u64,

    /// Posts across the last 24 buckets.
    pub last_24: u64,
}

/// The result of a search request.
#[derive(Debug)]
pub struct FetchReport {
    /// Where the raw response was saved.
    pub raw_path: PathBuf,

    /// Where the normalized rows were saved.
    pub clean_path: PathBuf,

    /// Page size sent to the API, after clamping.
    pub requested: u32,

    /// Rows actually delivered, and charged against the quota.
    pub rows: usize,

    /// Rows charged this month, including this request.
    pub monthly_count: u32,

    /// A summary of the delivered rows.
    pub summary: Summary,
}

/// Sends guarded requests and archives their results.
#[derive(Debug)]
pub struct Harvester<S: Service, C: Clock> {
    client: XClient<S>,
    store: StateStore<C>,
    layout: Layout,
    salt: String,
}

impl<S: Service, C: Clock> Harvester<S, C> {
    /// Creates a harvester that sends requests through `service`, keeps
    /// its files under `layout`, and tells time with `clock`.
    pub fn new(service: S, clock: C, layout: Layout) -> Self {
        let store = StateStore::new(layout.state_path(), clock);
        Self {
            client: XClient::new(service),
            store,
            layout,
            salt: String::from(conf::DEFAULT_SALT),
        }
    }

    /// Replaces the pseudonymization salt.
    pub fn salt(self, salt: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            ..self
        }
    }

    /// The API client.
    pub fn client(&self) -> &XClient<S> {
        &self.client
    }

    /// The quota state store.
    pub fn store(&self) -> &StateStore<C> {
        &self.store
    }

    /// Retrieves post volume for the query named `query_key` and saves
    /// the raw response.
    pub async fn scout(
        &self,
        query_key: &str,
        granularity: Granularity,
    ) -> Result<Outcome<CountsReport>> {
        let query = self.prepare(query_key)?;

        let state = self.store.load()?;
        let decision = guard::counts_rate(&state, self.store.clock());
        if !decision.is_allowed() {
            info!("counts request for '{query_key}' denied: {decision}");
            return Ok(Outcome::Denied(Denial::new(DenialKind::CountsRate, decision)));
        }

        debug!("requesting {granularity} counts for '{query_key}'");
        let body = self.client.counts_body(&query, granularity).await?;
        self.store.mark_counts_called()?;
        let counts: Fetched<CountsResponse> = client::parse(&body)?;

        let now = self.store.clock().now();
        let record = json!({
            "query_key": query_key,
            "query": query,
            "granularity": granularity.as_str(),
            "fetched_at": now.to_rfc3339(),
            "response": counts.raw(),
        });
        let raw_path = self
            .layout
            .raw_dir()
            .join(archive::counts_file_name(query_key, &file_tag(&now)));
        let raw_path = archive::save_jsonl(&[record], raw_path)?;

        Ok(Outcome::Done(CountsReport {
            raw_path,
            total: counts.parsed().total(),
            last_24: counts.parsed().recent_total(24),
        }))
    }

    /// Retrieves recent posts for the query named `query_key`, saves the
    /// raw response and the normalized rows, and charges the delivered
    /// rows against the monthly quota.
    ///
    /// `max_results` is clamped into the range the API accepts before
    /// the quota is checked.
    pub async fn fetch(
        &self,
        query_key: &str,
        max_results: u32,
        anonymize: bool,
    ) -> Result<Outcome<FetchReport>> {
        let query = self.prepare(query_key)?;
        let requested = guard::clamp_max_results(max_results);

        let state = self.store.load()?;
        let decision = guard::monthly_quota(&state, requested);
        if !decision.is_allowed() {
            info!("search for '{query_key}' denied: {decision}");
            return Ok(Outcome::Denied(Denial::new(DenialKind::MonthlyQuota, decision)));
        }
        let decision = guard::search_rate(&state, self.store.clock());
        if !decision.is_allowed() {
            info!("search for '{query_key}' denied: {decision}");
            return Ok(Outcome::Denied(Denial::new(DenialKind::SearchRate, decision)));
        }

        debug!("searching '{query_key}' for up to {requested} posts");
        let body = self.client.search_body(&query, requested).await?;
        self.store.mark_search_called()?;
        let search: Fetched<SearchResponse> = client::parse(&body)?;

        let now = self.store.clock().now();
        let tag = file_tag(&now);
        let raw_path = self
            .layout
            .raw_dir()
            .join(archive::raw_fetch_file_name(query_key, &tag));
        let raw_path = archive::save_jsonl(&[search.raw().clone()], raw_path)?;

        let anonymizer = Anonymizer::new(anonymize, self.salt.as_str());
        let rows = normalize(search.parsed(), query_key, &anonymizer, &now);
        let charged = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let state = self.store.bump_monthly_count(charged)?;
        debug!("charged {charged} rows; {} used this month", state.monthly_count);

        let clean_path = self
            .layout
            .clean_dir()
            .join(archive::clean_fetch_file_name(query_key, &tag));
        let clean_path = archive::write_clean_csv(&rows, clean_path)?;

        Ok(Outcome::Done(FetchReport {
            raw_path,
            clean_path,
            requested,
            rows: rows.len(),
            monthly_count: state.monthly_count,
            summary: Summary::of(&rows),
        }))
    }

    fn prepare(&self, query_key: &str) -> Result<String> {
        let query = QueryBook::load(self.layout.queries_path())?.resolve(query_key)?;
        debug!("resolved '{query_key}' to {query:?}");
        self.layout.ensure_dirs()?;
        Ok(query)
    }
}

/// The result of a harvesting operation.
pub type Result<T> = std::result::Result<T, Error>;

/// A harvesting operation failed.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration is unusable; nothing was sent.
    #[error(transparent)]
    Config(#[from] conf::Error),

    /// The quota state could not be read or written.
    #[error(transparent)]
    State(#[from] state::Error),

    /// The API request failed or answered with an unreadable body.
    #[error("Remote call failed: {0}")]
    Remote(#[from] client::Error),

    /// An artifact could not be written.
    #[error(transparent)]
    Archive(#[from] archive::Error),
}

impl Error {
    /// The process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Remote(_) => 4,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{DateTime, TimeDelta, Utc};
    use crate::normalize::pseudonymize;
    use crate::state::QuotaState;
    use crate::test_utils::{FailingService, FrozenClock, TestService, do_logging};
    use reqwest::StatusCode;
    use std::fs;
    use tempfile::TempDir;

    const QUERIES: &str = "rizin_ufc: |\n  (RIZIN OR UFC)\n  lang:ja -is:retweet\n";

    fn setup(queries: &str) -> TempDir {
        do_logging();
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("queries.yaml"), queries).unwrap();
        dir
    }

    fn harvester<S: Service>(dir: &TempDir, service: S) -> Harvester<S, FrozenClock> {
        Harvester::new(service, FrozenClock::default(), Layout::new(dir.path())).salt("pepper")
    }

    fn now() -> DateTime<Utc> {
        FrozenClock::default().now()
    }

    fn seed<S: Service>(harvester: &Harvester<S, FrozenClock>, state: QuotaState) -> String {
        harvester.store().save(&state).unwrap();
        fs::read_to_string(harvester.store().path()).unwrap()
    }

    fn state(used: u32, last_counts: Option<i64>, last_search: Option<i64>) -> QuotaState {
        QuotaState {
            monthly_count: used,
            last_counts_ts: last_counts.map(|mins| now() - TimeDelta::minutes(mins)),
            last_search_ts: last_search.map(|mins| now() - TimeDelta::minutes(mins)),
            ..QuotaState::new("2025-05")
        }
    }

    mod fetch {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn it_denies_a_search_that_would_exceed_the_quota() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());
            let before = seed(&harvester, state(95, None, None));

            let outcome = harvester.fetch("rizin_ufc", 10, false).await.unwrap();

            let Outcome::Denied(denial) = outcome else {
                panic!("expected a denial");
            };
            assert_eq!(denial.kind(), DenialKind::MonthlyQuota);
            assert_eq!(
                denial.reason(),
                "quota would be exceeded: used=95, request=10, limit=100"
            );
            assert_eq!(harvester.client().service().calls(), 0);
            assert_eq!(fs::read_to_string(harvester.store().path()).unwrap(), before);
        }

        #[tokio::test]
        async fn it_charges_delivered_rows_and_stamps_the_search() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());
            seed(&harvester, state(50, None, Some(20)));

            let outcome = harvester.fetch("rizin_ufc", 10, false).await.unwrap();

            let Outcome::Done(report) = outcome else {
                panic!("expected a fetch");
            };
            assert_eq!(report.rows, 8);
            assert_eq!(report.requested, 10);
            assert_eq!(report.monthly_count, 58);
            assert_eq!(report.summary.records(), 8);

            let state = harvester.store().load().unwrap();
            assert_eq!(state.monthly_count, 58);
            assert_eq!(state.last_search_ts, Some(now()));
            assert_eq!(state.last_counts_ts, None);
            assert_eq!(harvester.client().service().calls(), 1);
        }

        #[tokio::test]
        async fn it_saves_raw_and_clean_artifacts() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());

            let Outcome::Done(report) = harvester.fetch("rizin_ufc", 10, false).await.unwrap()
            else {
                panic!("expected a fetch");
            };

            let layout = Layout::new(dir.path());
            assert_eq!(
                report.raw_path,
                layout.raw_dir().join("fetch_rizin_ufc_20250523171300.jsonl")
            );
            assert_eq!(
                report.clean_path,
                layout.clean_dir().join("fetch_rizin_ufc_20250523171300.csv")
            );

            let raw = fs::read_to_string(&report.raw_path).unwrap();
            assert_eq!(raw.lines().count(), 1);
            let raw: serde_json::Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(raw["meta"]["result_count"], 8);

            let clean = fs::read_to_string(&report.clean_path).unwrap();
            assert_eq!(clean.lines().count(), 9);
            assert!(clean.contains("rizin_fan"));
        }

        #[tokio::test]
        async fn it_pseudonymizes_authors_when_asked() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());

            let Outcome::Done(report) = harvester.fetch("rizin_ufc", 10, true).await.unwrap()
            else {
                panic!("expected a fetch");
            };

            let clean = fs::read_to_string(&report.clean_path).unwrap();
            assert!(!clean.contains("rizin_fan"));
            assert!(!clean.contains(",1001,"));
            assert!(clean.contains(&pseudonymize("1001", "pepper")));
        }

        #[tokio::test]
        async fn it_clamps_the_page_size() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());
            let Outcome::Done(report) = harvester.fetch("rizin_ufc", 3, false).await.unwrap()
            else {
                panic!("expected a fetch");
            };
            assert_eq!(report.requested, 10);
        }

        #[tokio::test]
        async fn it_checks_the_clamped_page_size_against_the_quota() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());
            seed(&harvester, state(10, None, None));

            let outcome = harvester.fetch("rizin_ufc", 500, false).await.unwrap();

            let Outcome::Denied(denial) = outcome else {
                panic!("expected a denial");
            };
            assert_eq!(
                denial.reason(),
                "quota would be exceeded: used=10, request=100, limit=100"
            );
        }

        #[tokio::test]
        async fn it_denies_a_search_made_too_soon() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());
            let before = seed(&harvester, state(0, None, Some(5)));

            let outcome = harvester.fetch("rizin_ufc", 10, false).await.unwrap();

            let Outcome::Denied(denial) = outcome else {
                panic!("expected a denial");
            };
            assert_eq!(denial.kind(), DenialKind::SearchRate);
            assert!(denial.reason().contains("300s"), "{denial}");
            assert_eq!(harvester.client().service().calls(), 0);
            assert_eq!(fs::read_to_string(harvester.store().path()).unwrap(), before);
        }

        #[tokio::test]
        async fn it_checks_the_quota_before_the_rate_limit() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());
            seed(&harvester, state(100, None, Some(1)));

            let outcome = harvester.fetch("rizin_ufc", 10, false).await.unwrap();

            assert!(matches!(
                outcome,
                Outcome::Denied(Denial {
                    kind: DenialKind::MonthlyQuota,
                    ..
                })
            ));
        }

        #[tokio::test]
        async fn it_leaves_state_alone_when_the_request_fails() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, FailingService::new(StatusCode::SERVICE_UNAVAILABLE));
            let before = seed(&harvester, state(50, None, Some(20)));

            let err = harvester.fetch("rizin_ufc", 10, false).await.unwrap_err();

            assert!(matches!(err, Error::Remote(_)));
            assert_eq!(err.exit_code(), 4);
            assert_eq!(harvester.client().service().calls(), 1);
            assert_eq!(fs::read_to_string(harvester.store().path()).unwrap(), before);
            let raw_files = fs::read_dir(Layout::new(dir.path()).raw_dir()).unwrap().count();
            assert_eq!(raw_files, 0);
        }

        #[tokio::test]
        async fn it_stamps_the_request_when_the_response_is_unreadable() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::new("counts_hour", "not_json"));
            seed(&harvester, state(50, None, None));

            let err = harvester.fetch("rizin_ufc", 10, false).await.unwrap_err();

            assert!(matches!(err, Error::Remote(client::Error::Parse(_))));
            assert_eq!(err.exit_code(), 4);
            let state = harvester.store().load().unwrap();
            assert_eq!(state.last_search_ts, Some(now()));
            assert_eq!(state.monthly_count, 50);
            let raw_files = fs::read_dir(Layout::new(dir.path()).raw_dir()).unwrap().count();
            assert_eq!(raw_files, 0);
        }

        #[tokio::test]
        async fn it_denies_a_retry_after_an_unreadable_response() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::new("counts_hour", "not_json"));
            seed(&harvester, state(50, None, None));

            harvester.fetch("rizin_ufc", 10, false).await.unwrap_err();
            let outcome = harvester.fetch("rizin_ufc", 10, false).await.unwrap();

            assert!(matches!(
                outcome,
                Outcome::Denied(Denial {
                    kind: DenialKind::SearchRate,
                    ..
                })
            ));
            assert_eq!(harvester.client().service().calls(), 1);
        }
    }

    mod scout {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn it_reports_counts_and_stamps_the_request() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());

            let outcome = harvester.scout("rizin_ufc", Granularity::Hour).await.unwrap();

            let Outcome::Done(report) = outcome else {
                panic!("expected counts");
            };
            assert_eq!(report.total, 360);
            assert_eq!(report.last_24, 360);

            let state = harvester.store().load().unwrap();
            assert_eq!(state.last_counts_ts, Some(now()));
            assert_eq!(state.last_search_ts, None);
            assert_eq!(state.monthly_count, 0);
        }

        #[tokio::test]
        async fn it_wraps_the_raw_response() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());

            let Outcome::Done(report) = harvester.scout("rizin_ufc", Granularity::Hour).await.unwrap()
            else {
                panic!("expected counts");
            };

            assert_eq!(
                report.raw_path,
                Layout::new(dir.path())
                    .raw_dir()
                    .join("counts_rizin_ufc_20250523171300.jsonl")
            );
            let raw = fs::read_to_string(&report.raw_path).unwrap();
            let raw: serde_json::Value = serde_json::from_str(raw.trim_end()).unwrap();
            assert_eq!(raw["query_key"], "rizin_ufc");
            assert_eq!(raw["query"], "(RIZIN OR UFC) lang:ja -is:retweet");
            assert_eq!(raw["granularity"], "hour");
            assert_eq!(raw["fetched_at"], "2025-05-23T17:13:00+00:00");
            assert_eq!(raw["response"]["meta"]["total_tweet_count"], 360);
        }

        #[tokio::test]
        async fn it_denies_counts_made_too_soon() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());
            let before = seed(&harvester, state(0, Some(10), None));

            let outcome = harvester.scout("rizin_ufc", Granularity::Day).await.unwrap();

            let Outcome::Denied(denial) = outcome else {
                panic!("expected a denial");
            };
            assert_eq!(denial.kind(), DenialKind::CountsRate);
            assert_eq!(denial.kind().exit_code(), 2);
            assert!(denial.reason().contains("600s"), "{denial}");
            assert_eq!(harvester.client().service().calls(), 0);
            assert_eq!(fs::read_to_string(harvester.store().path()).unwrap(), before);
        }

        #[tokio::test]
        async fn it_leaves_state_alone_when_the_request_fails() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, FailingService::new(StatusCode::UNAUTHORIZED));
            let before = seed(&harvester, state(0, None, None));

            let err = harvester.scout("rizin_ufc", Granularity::Hour).await.unwrap_err();

            assert_eq!(err.exit_code(), 4);
            assert_eq!(fs::read_to_string(harvester.store().path()).unwrap(), before);
        }

        #[tokio::test]
        async fn it_stamps_the_request_when_the_response_is_unreadable() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::new("not_json", "search_recent"));
            seed(&harvester, state(7, None, None));

            let err = harvester.scout("rizin_ufc", Granularity::Hour).await.unwrap_err();

            assert!(matches!(err, Error::Remote(client::Error::Parse(_))));
            let state = harvester.store().load().unwrap();
            assert_eq!(state.last_counts_ts, Some(now()));
            assert_eq!(state.last_search_ts, None);
            assert_eq!(state.monthly_count, 7);
        }
    }

    mod configuration {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn it_rejects_long_queries_before_touching_anything() {
            let long = format!("long: \"{}\"\n", "x".repeat(513));
            let dir = setup(&long);
            let harvester = harvester(&dir, TestService::default());

            let err = harvester.fetch("long", 10, false).await.unwrap_err();

            assert!(matches!(
                err,
                Error::Config(conf::Error::QueryTooLong { len: 513 })
            ));
            assert_eq!(err.exit_code(), 1);
            assert_eq!(harvester.client().service().calls(), 0);
            assert!(!harvester.store().path().exists());
        }

        #[tokio::test]
        async fn it_rejects_unknown_keys() {
            let dir = setup(QUERIES);
            let harvester = harvester(&dir, TestService::default());

            let err = harvester.scout("boxing", Granularity::Hour).await.unwrap_err();

            assert!(matches!(err, Error::Config(conf::Error::UnknownKey(_))));
            assert_eq!(harvester.client().service().calls(), 0);
            assert!(!harvester.store().path().exists());
        }

        #[tokio::test]
        async fn it_requires_a_query_book() {
            do_logging();
            let dir = TempDir::new().unwrap();
            let harvester = harvester(&dir, TestService::default());

            let err = harvester.scout("rizin_ufc", Granularity::Hour).await.unwrap_err();

            assert!(matches!(err, Error::Config(conf::Error::MissingQueries(_))));
        }
    }

    mod denial {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn it_maps_kinds_to_exit_codes() {
            assert_eq!(DenialKind::CountsRate.exit_code(), 2);
            assert_eq!(DenialKind::SearchRate.exit_code(), 2);
            assert_eq!(DenialKind::MonthlyQuota.exit_code(), 3);
        }
    }
}
