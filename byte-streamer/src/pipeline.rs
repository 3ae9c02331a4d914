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

//! Static pipeline description consumed by the runtime.
//!
//! These are the structures a configuration front end yields: named
//! endpoint declarations with optional start-ordering dependencies, and
//! connections wiring a source endpoint through a filter chain into a
//! destination endpoint.

/// A declared endpoint: the factory key, its opaque config string, and an
/// optional endpoint that must be registered before this one is started.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EndpointInfo {
    pub name: String,
    pub kind: String,
    pub config: String,
    pub depends: Option<String>,
}

/// One filter invocation inside a connection chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilterInfo {
    pub name: String,
    pub config: String,
}

/// A 1-to-1 connection from `from` through `filters` (in declaration order)
/// into `to`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectInfo {
    pub from: String,
    pub to: String,
    pub filters: Vec<FilterInfo>,
}

/// The full static pipeline: everything the supervisor needs to run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Pipeline {
    pub endpoints: Vec<EndpointInfo>,
    pub connections: Vec<ConnectInfo>,
}
