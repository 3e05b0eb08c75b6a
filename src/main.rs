// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2025 Michael Dippery <michael@monkey-robot.com>

use clap::Parser;
use freescout::cli::Config;
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = Config::parse();

    env_logger::Builder::new()
        .filter_level(config.verbosity().log_level_filter())
        .init();

    let code = freescout::cli::run(config).await;
    process::exit(code);
}
