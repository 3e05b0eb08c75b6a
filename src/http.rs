// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! Plumbing shared by services that talk to APIs over HTTP.

use reqwest::header::{self, HeaderMap};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Builds HTTP clients with a consistent user agent and timeout.
#[derive(Debug)]
pub struct HTTPClientFactory {
    user_agent: String,
    timeout: Duration,
}

impl HTTPClientFactory {
    /// Requests that take longer than this are abandoned.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a factory for clients that identify themselves as
    /// `name` at `version`.
    pub fn new(name: &str, version: &str) -> Self {
        let user_agent = format!("{name} v{version}");
        Self {
            user_agent,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// The user agent sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Creates a new client.
    pub fn create(&self) -> HTTPResult<Client> {
        let client = Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .build()?;
        Ok(client)
    }
}

impl Default for HTTPClientFactory {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// How often and how patiently transient failures are retried.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each subsequent retry.
    pub base_delay: Duration,

    /// No single delay is longer than this, even if the server asks.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// How long to wait before retry number `attempt` (starting at 1)
    /// after `error`.
    ///
    /// A server-supplied `retry-after` hint is honored up to
    /// [`RetryPolicy::max_delay`].
    pub fn delay(&self, attempt: u32, error: &HTTPError) -> Duration {
        let backoff = match error.retry_after() {
            Some(retry_after) => retry_after,
            None => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1))),
        };
        backoff.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// The result of an HTTP request.
pub type HTTPResult<T> = Result<T, HTTPError>;

/// Indicates an error has occurred when making an HTTP call.
#[derive(Debug, Error)]
pub enum HTTPError {
    /// An error that occurred while making an HTTP request or reading
    /// its body.
    #[error("Error while making HTTP request: {0}")]
    Request(#[from] reqwest::Error),

    /// An unsuccessful HTTP status code in an HTTP response.
    #[error("Request returned HTTP {status}{}", hints(.retry_after, .rate_limit_reset))]
    Api {
        /// The response status.
        status: StatusCode,

        /// How long the server asked us to wait, from `retry-after`.
        retry_after: Option<Duration>,

        /// When the server's rate-limit window resets, as a Unix
        /// timestamp, from `x-rate-limit-reset`.
        rate_limit_reset: Option<i64>,
    },

    /// A missing Content-Type header in a response.
    #[error("Missing Content-Type header")]
    MissingContentType,

    /// An invalid Content-Type header.
    #[error("Invalid Content-Type header value: {0}")]
    InvalidContentType(#[from] header::ToStrError),

    /// A Content-Type that is not understood by the service.
    #[error("Unexpected content type: {0}")]
    UnexpectedContentType(String),
}

impl HTTPError {
    /// Builds an [`HTTPError::Api`] from an unsuccessful response's status
    /// and headers.
    pub fn from_status(status: StatusCode, headers: &HeaderMap) -> Self {
        let retry_after = header_value(headers, header::RETRY_AFTER.as_str())
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs);
        let rate_limit_reset = header_value(headers, "x-rate-limit-reset")
            .and_then(|reset| reset.parse::<i64>().ok());
        HTTPError::Api {
            status,
            retry_after,
            rate_limit_reset,
        }
    }

    /// The HTTP status, if the server responded at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HTTPError::Api { status, .. } => Some(*status),
            HTTPError::Request(err) => err.status(),
            _ => None,
        }
    }

    /// How long the server asked us to wait before trying again.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            HTTPError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// True if the same request might succeed if it is sent again.
    ///
    /// Rate limiting, server errors, timeouts and connection failures are
    /// transient; everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            HTTPError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            HTTPError::Request(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn hints(retry_after: &Option<Duration>, rate_limit_reset: &Option<i64>) -> String {
    let mut hints = Vec::new();
    if let Some(retry_after) = retry_after {
        hints.push(format!("retry after {}s", retry_after.as_secs()));
    }
    if let Some(reset) = rate_limit_reset {
        hints.push(format!("rate limit resets at {reset}"));
    }
    if hints.is_empty() {
        String::new()
    } else {
        format!(" ({})", hints.join(", "))
    }
}
