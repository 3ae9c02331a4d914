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

//! # byte-streamer
//!
//! `byte-streamer` runs declarative byte pipelines: a static [`Pipeline`]
//! names a set of endpoints (sockets, files, a child process's stdio, a
//! serial port, the process's own stdio, an in-memory echo, a null sink)
//! and wires them into connections, each streaming bytes from a source
//! endpoint through a chain of pull-driven filters into a destination
//! endpoint. All connections run concurrently until the first error;
//! end-of-stream is itself a terminal event.
//!
//! Typical usage is API-first and centered on [`ByteStreamer`]: build a
//! [`Pipeline`] (usually with a configuration front end), construct the
//! streamer — configuration errors surface here, before any I/O — and
//! `run()` it.
//!
//! ## Quick start
//!
//! ```
//! use byte_streamer::{ByteStreamer, ConnectInfo, EndpointInfo, Pipeline};
//!
//! let pipeline = Pipeline {
//!     endpoints: vec![
//!         EndpointInfo {
//!             name: "loop".to_string(),
//!             kind: "echo".to_string(),
//!             config: String::new(),
//!             depends: None,
//!         },
//!         EndpointInfo {
//!             name: "sink".to_string(),
//!             kind: "null".to_string(),
//!             config: String::new(),
//!             depends: None,
//!         },
//!     ],
//!     connections: vec![ConnectInfo {
//!         from: "loop".to_string(),
//!         to: "sink".to_string(),
//!         filters: vec![],
//!     }],
//! };
//!
//! let streamer = ByteStreamer::new(pipeline).expect("pipeline validates");
//! let registry = streamer.registry();
//! // tokio::spawn(streamer.run()) drives the pipeline; `registry` resolves
//! // endpoints against it (suspending until they are registered).
//! # drop(registry);
//! ```
//!
//! ## Internal architecture map
//!
//! - Byte-stream abstractions: [`Endpoint`], [`ByteSource`], [`ByteFilter`]
//! - Endpoint factory: kind tag -> asynchronous constructor task
//! - Filter factory: name tag -> pull-driven transformer
//! - Broker: supervisor-owned registry with parked, ordered lookups
//! - Connection pump: resolve, compose, copy until the terminal event
//! - Supervisor: [`ByteStreamer`] — validation, event multiplexing,
//!   coordinated shutdown on first error
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events. Library code emits
//! structured events and does not install a global subscriber; binaries
//! and tests own one-time `tracing_subscriber` initialization.

mod broker;
mod connection;
mod endpoint;
mod error;
mod factory;
mod filters;
mod observability;
mod pipeline;
mod streamer;

pub use broker::RegistryHandle;
pub use endpoint::{
    null_read_half, null_write_half, ByteFilter, ByteSource, Endpoint, ReadHalf, WriteHalf,
};
pub use error::StreamerError;
pub use pipeline::{ConnectInfo, EndpointInfo, FilterInfo, Pipeline};
pub use streamer::ByteStreamer;
