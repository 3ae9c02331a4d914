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

//! Supervisor: owns the registry and runs the pipeline to its terminal
//! error.
//!
//! Construction validates the static pipeline so configuration errors
//! surface before any I/O begins. `run()` starts every endpoint with no
//! dependency, spawns one pump task per connection, then multiplexes three
//! event sources: endpoint lookups (park or satisfy), endpoint
//! announcements (register, then start dependents — a lazy topological
//! walk of the dependency DAG), and errors. The first error triggers
//! coordinated shutdown: the shutdown signal fires, every registered
//! endpoint is closed exactly once, and the error is returned.

use crate::broker::{LookupRequest, Registry, RegistryHandle, ShutdownSignal};
use crate::connection;
use crate::endpoint::Endpoint;
use crate::error::StreamerError;
use crate::factory;
use crate::filters;
use crate::observability::events;
use crate::pipeline::{EndpointInfo, Pipeline};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

const COMPONENT: &str = "streamer";

const CHANNEL_CAPACITY: usize = 32;

/// Bound on flushing one endpoint during shutdown, so a wedged peer cannot
/// hang the process on its way out.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a validated [`Pipeline`]: the supervisor owning the endpoint
/// registry, the factory tasks, and the connection pumps.
///
/// # Examples
///
/// ```
/// use byte_streamer::{ByteStreamer, ConnectInfo, EndpointInfo, Pipeline};
///
/// let pipeline = Pipeline {
///     endpoints: vec![
///         EndpointInfo {
///             name: "src".to_string(),
///             kind: "echo".to_string(),
///             config: String::new(),
///             depends: None,
///         },
///         EndpointInfo {
///             name: "sink".to_string(),
///             kind: "null".to_string(),
///             config: String::new(),
///             depends: Some("src".to_string()),
///         },
///     ],
///     connections: vec![ConnectInfo {
///         from: "src".to_string(),
///         to: "sink".to_string(),
///         filters: vec![],
///     }],
/// };
///
/// let streamer = ByteStreamer::new(pipeline).unwrap();
/// let _registry = streamer.registry();
/// // streamer.run().await drives the pipeline until its first error.
/// ```
pub struct ByteStreamer {
    pipeline: Pipeline,
    registry: Registry,
    handle: RegistryHandle,
    lookup_rx: mpsc::Receiver<LookupRequest>,
    announce_tx: mpsc::Sender<Endpoint>,
    announce_rx: mpsc::Receiver<Endpoint>,
    error_tx: mpsc::Sender<StreamerError>,
    error_rx: mpsc::Receiver<StreamerError>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_signal: ShutdownSignal,
}

impl ByteStreamer {
    /// Validates the pipeline and wires the supervisor's channels.
    ///
    /// # Errors
    ///
    /// Configuration errors: duplicate endpoint names, unknown endpoint
    /// kinds, unknown filter names, a `depends` clause naming an
    /// undeclared endpoint, or a dependency cycle.
    pub fn new(pipeline: Pipeline) -> Result<Self, StreamerError> {
        validate(&pipeline)?;

        let configured = pipeline
            .endpoints
            .iter()
            .map(|endpoint| endpoint.name.clone())
            .collect::<HashSet<_>>();

        let (lookup_tx, lookup_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (announce_tx, announce_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_signal) = ShutdownSignal::new();

        Ok(Self {
            pipeline,
            registry: Registry::new(configured),
            handle: RegistryHandle::new(lookup_tx),
            lookup_rx,
            announce_tx,
            announce_rx,
            error_tx,
            error_rx,
            shutdown_tx,
            shutdown_signal,
        })
    }

    /// Handle for resolving endpoints against this pipeline's registry.
    pub fn registry(&self) -> RegistryHandle {
        self.handle.clone()
    }

    /// Runs the pipeline until its first terminal event.
    ///
    /// End-of-stream on any connection is itself terminal, so a successful
    /// return does not occur in practice; the result is `Err` carrying the
    /// first error after every registered endpoint has been closed.
    pub async fn run(mut self) -> Result<(), StreamerError> {
        info!(
            event = events::RUN_START,
            component = COMPONENT,
            endpoints = self.pipeline.endpoints.len(),
            connections = self.pipeline.connections.len(),
            "starting pipeline"
        );

        // Endpoints with no dependency start immediately; the rest are
        // started as their dependencies announce.
        if let Err(error) = self.start_dependents(None) {
            return self.shutdown(error).await;
        }

        for connect in self.pipeline.connections.clone() {
            tokio::spawn(connection::run_connection(
                connect,
                self.handle.clone(),
                self.shutdown_signal.clone(),
                self.error_tx.clone(),
            ));
        }

        let error = loop {
            tokio::select! {
                Some(request) = self.lookup_rx.recv() => {
                    self.registry.serve(request);
                }
                Some(endpoint) = self.announce_rx.recv() => {
                    let name = endpoint.name().to_string();
                    if let Err(error) = self.registry.announce(endpoint) {
                        break error;
                    }
                    if let Err(error) = self.start_dependents(Some(&name)) {
                        break error;
                    }
                }
                Some(error) = self.error_rx.recv() => {
                    break error;
                }
            }
        };

        self.shutdown(error).await
    }

    /// Starts every configured endpoint whose `depends` matches the given
    /// dependency (`None` for endpoints with no dependency).
    fn start_dependents(&self, dependency: Option<&str>) -> Result<(), StreamerError> {
        for endpoint_info in &self.pipeline.endpoints {
            let starts_now = match (&endpoint_info.depends, dependency) {
                (None, None) => true,
                (Some(depends), Some(announced)) => depends == announced,
                _ => false,
            };
            if starts_now {
                factory::spawn_endpoint(
                    endpoint_info.clone(),
                    self.announce_tx.clone(),
                    self.error_tx.clone(),
                )?;
            }
        }
        Ok(())
    }

    /// Coordinated shutdown: fire the shutdown signal (which releases
    /// held-open streams), close every registered endpoint once, and hand
    /// the terminal error back.
    async fn shutdown(self, error: StreamerError) -> Result<(), StreamerError> {
        warn!(
            event = events::SHUTDOWN_START,
            component = COMPONENT,
            constructed = self.registry.construction_log().len(),
            err = %error,
            "shutting down pipeline"
        );
        let _ = self.shutdown_tx.send(true);

        for endpoint in self.registry.endpoints() {
            match tokio::time::timeout(CLOSE_TIMEOUT, endpoint.close()).await {
                Ok(Ok(())) => debug!(
                    event = events::ENDPOINT_CLOSE,
                    component = COMPONENT,
                    endpoint = endpoint.name(),
                    "endpoint closed"
                ),
                Ok(Err(cause)) => warn!(
                    event = events::ENDPOINT_CLOSE_FAILED,
                    component = COMPONENT,
                    endpoint = endpoint.name(),
                    err = %cause,
                    "endpoint close failed"
                ),
                Err(_) => warn!(
                    event = events::ENDPOINT_CLOSE_TIMEOUT,
                    component = COMPONENT,
                    endpoint = endpoint.name(),
                    "endpoint close timed out"
                ),
            }
        }

        Err(error)
    }
}

fn validate(pipeline: &Pipeline) -> Result<(), StreamerError> {
    let mut names = HashSet::new();
    for endpoint in &pipeline.endpoints {
        if !names.insert(endpoint.name.as_str()) {
            return Err(StreamerError::DuplicateEndpoint {
                name: endpoint.name.clone(),
            });
        }
        if !factory::is_known_kind(&endpoint.kind) {
            return Err(StreamerError::UnknownEndpointKind {
                kind: endpoint.kind.clone(),
            });
        }
    }

    for connect in &pipeline.connections {
        for filter in &connect.filters {
            if !filters::is_known_filter(&filter.name) {
                return Err(StreamerError::UnknownFilter {
                    name: filter.name.clone(),
                });
            }
        }
    }

    validate_dependencies(&pipeline.endpoints, &names)
}

/// Dependency edges must form a DAG over declared endpoints; anything else
/// would park factories forever, and that deadlock has to be explicit.
fn validate_dependencies(
    endpoints: &[EndpointInfo],
    names: &HashSet<&str>,
) -> Result<(), StreamerError> {
    for endpoint in endpoints {
        if let Some(depends) = &endpoint.depends {
            if !names.contains(depends.as_str()) {
                return Err(StreamerError::UnknownDependency {
                    name: endpoint.name.clone(),
                    depends: depends.clone(),
                });
            }
        }
    }

    let mut startable: HashSet<&str> = HashSet::new();
    loop {
        let before = startable.len();
        for endpoint in endpoints {
            if startable.contains(endpoint.name.as_str()) {
                continue;
            }
            let ready = match &endpoint.depends {
                None => true,
                Some(depends) => startable.contains(depends.as_str()),
            };
            if ready {
                startable.insert(endpoint.name.as_str());
            }
        }
        if startable.len() == endpoints.len() {
            return Ok(());
        }
        if startable.len() == before {
            for endpoint in endpoints {
                if !startable.contains(endpoint.name.as_str()) {
                    return Err(StreamerError::DependencyCycle {
                        name: endpoint.name.clone(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ByteStreamer;
    use crate::error::StreamerError;
    use crate::pipeline::{ConnectInfo, EndpointInfo, FilterInfo, Pipeline};

    fn endpoint(name: &str, kind: &str) -> EndpointInfo {
        EndpointInfo {
            name: name.to_string(),
            kind: kind.to_string(),
            config: String::new(),
            depends: None,
        }
    }

    fn endpoint_depending(name: &str, kind: &str, depends: &str) -> EndpointInfo {
        EndpointInfo {
            depends: Some(depends.to_string()),
            ..endpoint(name, kind)
        }
    }

    #[test]
    fn duplicate_endpoint_names_are_rejected() {
        let pipeline = Pipeline {
            endpoints: vec![endpoint("a", "echo"), endpoint("a", "null")],
            connections: vec![],
        };

        assert!(matches!(
            ByteStreamer::new(pipeline),
            Err(StreamerError::DuplicateEndpoint { name }) if name == "a"
        ));
    }

    #[test]
    fn unknown_endpoint_kind_is_rejected() {
        let pipeline = Pipeline {
            endpoints: vec![endpoint("a", "quantumLink")],
            connections: vec![],
        };

        assert!(matches!(
            ByteStreamer::new(pipeline),
            Err(StreamerError::UnknownEndpointKind { kind }) if kind == "quantumLink"
        ));
    }

    #[test]
    fn unknown_filter_name_is_rejected() {
        let pipeline = Pipeline {
            endpoints: vec![endpoint("a", "echo"), endpoint("b", "echo")],
            connections: vec![ConnectInfo {
                from: "a".to_string(),
                to: "b".to_string(),
                filters: vec![FilterInfo {
                    name: "rot13".to_string(),
                    config: String::new(),
                }],
            }],
        };

        assert!(matches!(
            ByteStreamer::new(pipeline),
            Err(StreamerError::UnknownFilter { name }) if name == "rot13"
        ));
    }

    #[test]
    fn dangling_dependency_is_rejected() {
        let pipeline = Pipeline {
            endpoints: vec![endpoint_depending("a", "echo", "missing")],
            connections: vec![],
        };

        assert!(matches!(
            ByteStreamer::new(pipeline),
            Err(StreamerError::UnknownDependency { depends, .. }) if depends == "missing"
        ));
    }

    #[test]
    fn dependency_cycles_are_rejected() {
        let pipeline = Pipeline {
            endpoints: vec![
                endpoint_depending("a", "echo", "b"),
                endpoint_depending("b", "echo", "a"),
            ],
            connections: vec![],
        };

        assert!(matches!(
            ByteStreamer::new(pipeline),
            Err(StreamerError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let pipeline = Pipeline {
            endpoints: vec![endpoint_depending("a", "echo", "a")],
            connections: vec![],
        };

        assert!(matches!(
            ByteStreamer::new(pipeline),
            Err(StreamerError::DependencyCycle { name }) if name == "a"
        ));
    }

    #[test]
    fn dependency_chains_over_declared_endpoints_validate() {
        let pipeline = Pipeline {
            endpoints: vec![
                endpoint("root", "echo"),
                endpoint_depending("mid", "echo", "root"),
                endpoint_depending("leaf", "echo", "mid"),
            ],
            connections: vec![],
        };

        assert!(ByteStreamer::new(pipeline).is_ok());
    }
}
