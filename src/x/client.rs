// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Clients for reading data from the X API.

use crate::http;
use crate::x::service::{Granularity, Service};
use crate::x::thing::{self, CountsResponse, SearchResponse};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// A response, both as the API sent it and parsed into records.
///
/// The raw form is kept so it can be archived verbatim, including any
/// fields freescout does not understand.
#[derive(Clone, Debug)]
pub struct Fetched<T> {
    raw: Value,
    parsed: T,
}

impl<T> Fetched<T> {
    /// The response exactly as the API returned it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The parsed response.
    pub fn parsed(&self) -> &T {
        &self.parsed
    }
}

/// Reads counts and posts through a [`Service`].
#[derive(Debug)]
pub struct XClient<S: Service> {
    service: S,
}

impl<S: Service> XClient<S> {
    /// Creates a client that makes requests through `service`.
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// The service requests are made through.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Retrieves post volume for `query`.
    pub async fn counts(
        &self,
        query: &str,
        granularity: Granularity,
    ) -> Result<Fetched<CountsResponse>, Error> {
        parse(&self.counts_body(query, granularity).await?)
    }

    /// Retrieves up to `max_results` recent posts matching `query`.
    pub async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Fetched<SearchResponse>, Error> {
        parse(&self.search_body(query, max_results).await?)
    }

    /// Retrieves post volume for `query` without parsing the response.
    ///
    /// An `Ok` means the API answered with a success status, so the
    /// request counts against its rate limit whether or not the body
    /// turns out to be readable.
    pub async fn counts_body(
        &self,
        query: &str,
        granularity: Granularity,
    ) -> Result<String, Error> {
        Ok(self.service.counts_recent(query, granularity).await?)
    }

    /// Retrieves recent posts for `query` without parsing the response.
    pub async fn search_body(&self, query: &str, max_results: u32) -> Result<String, Error> {
        Ok(self.service.search_recent(query, max_results).await?)
    }
}

/// Parses a response body returned by [`XClient::counts_body`] or
/// [`XClient::search_body`].
pub fn parse<T: DeserializeOwned>(body: &str) -> Result<Fetched<T>, Error> {
    debug!("parsing {} byte response", body.len());
    let raw: Value = serde_json::from_str(body).map_err(thing::Error::from)?;
    let parsed = thing::parse(raw.clone())?;
    Ok(Fetched { raw, parsed })
}

/// A client error.
#[derive(Debug, Error)]
pub enum Error {
    /// An error from the underlying HTTP service.
    #[error("Service error: {0}")]
    Service(#[from] http::HTTPError),

    /// An error parsing data.
    #[error("Parse error: {0}")]
    Parse(#[from] thing::Error),
}
