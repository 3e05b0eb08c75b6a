// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

//! X API clients and services for reading recent posts over HTTP.

pub mod client;
pub mod offline;
pub mod service;
pub mod thing;

pub use client::XClient;
pub use offline::OfflineService;
pub use service::{Granularity, Service, XService};
