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

//! Error taxonomy for the pipeline runtime.
//!
//! Configuration errors surface before any I/O begins; resolution, I/O and
//! end-of-stream errors are produced by running tasks and fan in to the
//! supervisor, where the first one triggers global shutdown.

use std::io;
use std::process::ExitStatus;

/// Errors produced while validating or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum StreamerError {
    /// Two configured endpoints share a name, or a factory announced a name
    /// that is already registered.
    #[error("duplicate endpoint name: {name}")]
    DuplicateEndpoint { name: String },

    /// No endpoint constructor is registered for this kind tag.
    #[error("unknown endpoint kind: {kind}")]
    UnknownEndpointKind { kind: String },

    /// No filter constructor is registered for this name tag.
    #[error("unknown filter: {name}")]
    UnknownFilter { name: String },

    /// The endpoint's config string cannot be used by its constructor.
    #[error("invalid config for endpoint {kind}({config}): {reason}")]
    InvalidEndpointConfig {
        kind: String,
        config: String,
        reason: String,
    },

    /// The filter's config string cannot be used by its constructor.
    #[error("invalid config for filter {name}({config}): {reason}")]
    InvalidFilterConfig {
        name: String,
        config: String,
        reason: String,
    },

    /// An endpoint's `depends` clause names an endpoint that is not declared.
    #[error("endpoint {name} depends on undeclared endpoint {depends}")]
    UnknownDependency { name: String, depends: String },

    /// The `depends` edges do not form a DAG; this endpoint can never start.
    #[error("dependency cycle involving endpoint {name}")]
    DependencyCycle { name: String },

    /// A connection or tap filter referenced a name that no configured
    /// endpoint bears, so the lookup can never be satisfied.
    #[error("unresolvable endpoint name: {name}")]
    UnresolvableEndpoint { name: String },

    /// The source side of a stream reported end-of-stream. Terminal for the
    /// whole pipeline: the supervisor treats it as the shutdown trigger.
    #[error("end of stream on {context}")]
    EndOfStream { context: String },

    /// A write accepted fewer bytes than requested.
    #[error("short write on {context}")]
    ShortWrite { context: String },

    /// A child process backing a `process` endpoint exited abnormally.
    #[error("process `{command}` exited with {status}")]
    ProcessExited { command: String, status: ExitStatus },

    /// An OS-level stream operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StreamerError {
    /// Wraps an `io::Error` with a human-readable operation context.
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StreamerError;
    use std::io;

    #[test]
    fn io_variant_keeps_context_and_source() {
        let error = StreamerError::io(
            "connecting to host:80",
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        );

        assert_eq!(error.to_string(), "connecting to host:80: refused");
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn short_write_is_distinguishable() {
        let error = StreamerError::ShortWrite {
            context: "connection [a -> b]".to_string(),
        };

        assert_eq!(error.to_string(), "short write on connection [a -> b]");
    }
}
