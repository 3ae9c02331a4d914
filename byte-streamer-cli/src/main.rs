/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod config;

use anyhow::{Context, Result};
use byte_streamer::ByteStreamer;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Wires the endpoints declared in a pipeline configuration file and
/// streams bytes between them until the first error.
#[derive(Parser)]
#[command(name = "byte-streamer")]
struct StreamerArgs {
    /// Path to the pipeline configuration file.
    config: PathBuf,

    /// Values bound to the configuration's declared params, in order.
    params: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = StreamerArgs::parse();
    info!(config = %args.config.display(), "started byte-streamer");

    let contents = std::fs::read_to_string(&args.config)
        .with_context(|| format!("unable to read config file {}", args.config.display()))?;
    let pipeline = config::parse_config(&contents, &args.params)
        .with_context(|| format!("unable to parse config file {}", args.config.display()))?;

    let streamer = ByteStreamer::new(pipeline)?;

    // End-of-stream is a terminal event, so a running pipeline never exits
    // cleanly; the first error comes back here and sets the exit status.
    streamer.run().await?;
    Ok(())
}
