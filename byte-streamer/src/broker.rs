/********************************************************************************
 * Copyright (c) 2025 Contributors to the Eclipse Foundation
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

//! Endpoint registry/broker: the supervisor-owned map of registered
//! endpoints plus the queue of parked lookups.
//!
//! All name resolution is serialized through the supervisor: connections
//! and filters send [`LookupRequest`]s over a channel and await a oneshot
//! reply. A request for an endpoint that is not yet registered parks in
//! arrival order and is satisfied, still in arrival order, when the
//! endpoint announces. A request for a name that no configured endpoint
//! bears can never be satisfied and is rejected immediately instead of
//! parking forever.

use crate::endpoint::Endpoint;
use crate::error::StreamerError;
use crate::observability::events;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

const COMPONENT: &str = "broker";

/// A pending endpoint lookup: the requested name and the channel the
/// endpoint is delivered on once it is registered.
pub(crate) struct LookupRequest {
    pub(crate) name: String,
    pub(crate) reply: oneshot::Sender<Endpoint>,
}

/// Cloneable handle for resolving endpoint names through the broker.
///
/// Used by connection pumps, by filters that need a side-channel endpoint,
/// and by tests that want to interact with a running pipeline.
#[derive(Clone)]
pub struct RegistryHandle {
    lookup_tx: mpsc::Sender<LookupRequest>,
}

impl RegistryHandle {
    pub(crate) fn new(lookup_tx: mpsc::Sender<LookupRequest>) -> Self {
        Self { lookup_tx }
    }

    /// Resolves an endpoint by name, suspending until it is registered.
    ///
    /// Fails if the name can never be satisfied (no configured endpoint
    /// bears it) or if the supervisor has already shut down.
    pub async fn endpoint(&self, name: &str) -> Result<Endpoint, StreamerError> {
        let (reply, response) = oneshot::channel();
        let request = LookupRequest {
            name: name.to_string(),
            reply,
        };
        if self.lookup_tx.send(request).await.is_err() {
            return Err(StreamerError::UnresolvableEndpoint {
                name: name.to_string(),
            });
        }
        response
            .await
            .map_err(|_| StreamerError::UnresolvableEndpoint {
                name: name.to_string(),
            })
    }
}

/// Cloneable handle that resolves once the supervisor begins shutdown.
///
/// Held by filters that suspend past end-of-stream; a dropped supervisor
/// counts as shutdown.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub(crate) fn new() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// Waits until shutdown has been triggered.
    pub async fn triggered(&mut self) {
        let _ = self.rx.wait_for(|fired| *fired).await;
    }
}

/// Supervisor-owned registry state. Only the supervisor mutates it, which
/// keeps announce/lookup ordering trivially defined and rules out
/// double-registration races.
pub(crate) struct Registry {
    endpoints: HashMap<String, Endpoint>,
    parked: Vec<LookupRequest>,
    construction_log: Vec<String>,
    configured: HashSet<String>,
}

impl Registry {
    /// Creates a registry that will only ever accept lookups for the given
    /// configured endpoint names.
    pub(crate) fn new(configured: HashSet<String>) -> Self {
        Self {
            endpoints: HashMap::new(),
            parked: Vec::new(),
            construction_log: Vec::new(),
            configured,
        }
    }

    /// Handles a factory announcement: registers the endpoint, records it
    /// in the construction log, and satisfies matching parked lookups.
    ///
    /// A name collision is a defect in the configuration or a factory and
    /// is fatal to the pipeline.
    pub(crate) fn announce(&mut self, endpoint: Endpoint) -> Result<(), StreamerError> {
        let name = endpoint.name().to_string();
        if self.endpoints.contains_key(&name) {
            warn!(
                event = events::ENDPOINT_ANNOUNCE_DUPLICATE,
                component = COMPONENT,
                endpoint = name.as_str(),
                "endpoint announced twice"
            );
            return Err(StreamerError::DuplicateEndpoint { name });
        }

        debug!(
            event = events::ENDPOINT_ANNOUNCE,
            component = COMPONENT,
            endpoint = name.as_str(),
            registered = self.endpoints.len() + 1,
            "endpoint registered"
        );
        self.construction_log.push(name.clone());
        self.endpoints.insert(name, endpoint);
        self.satisfy_parked();
        Ok(())
    }

    /// Handles a lookup: replies immediately if the endpoint is registered,
    /// rejects names that can never register, and parks everything else.
    pub(crate) fn serve(&mut self, request: LookupRequest) {
        if self.endpoints.contains_key(&request.name) {
            Self::deliver(&self.endpoints, request);
            return;
        }

        if !self.configured.contains(&request.name) {
            warn!(
                event = events::LOOKUP_REJECTED,
                component = COMPONENT,
                endpoint = request.name.as_str(),
                reason = "not_configured",
                "lookup for a name no configured endpoint bears"
            );
            // Dropping the reply channel surfaces the rejection to the
            // requester as an unresolvable-endpoint error.
            return;
        }

        debug!(
            event = events::LOOKUP_PARKED,
            component = COMPONENT,
            endpoint = request.name.as_str(),
            parked = self.parked.len() + 1,
            "endpoint not yet registered, parking lookup"
        );
        self.parked.push(request);
    }

    /// Endpoints registered so far, for shutdown.
    pub(crate) fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    /// Names in registration order.
    pub(crate) fn construction_log(&self) -> &[String] {
        &self.construction_log
    }

    fn satisfy_parked(&mut self) {
        let mut still_parked = Vec::with_capacity(self.parked.len());
        for request in self.parked.drain(..) {
            if self.endpoints.contains_key(&request.name) {
                Self::deliver(&self.endpoints, request);
            } else {
                still_parked.push(request);
            }
        }
        self.parked = still_parked;
    }

    fn deliver(endpoints: &HashMap<String, Endpoint>, request: LookupRequest) {
        let Some(endpoint) = endpoints.get(&request.name) else {
            return;
        };
        debug!(
            event = events::LOOKUP_SATISFIED,
            component = COMPONENT,
            endpoint = request.name.as_str(),
            "lookup satisfied"
        );
        if request.reply.send(endpoint.clone()).is_err() {
            warn!(
                event = events::LOOKUP_REPLY_DROPPED,
                component = COMPONENT,
                endpoint = request.name.as_str(),
                "requester went away before its lookup was satisfied"
            );
        }
    }
}
