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

//! Pull-driven byte filters and the name-tag filter factory.
//!
//! A connection composes its filters in declaration order: each filter's
//! source is set to the previously composed source, and the filter becomes
//! the new source. Filters live only for their connection.

mod delay;
mod eat_eof;
mod hex;
mod null;
mod tap;

use crate::broker::{RegistryHandle, ShutdownSignal};
use crate::endpoint::ByteFilter;
use crate::error::StreamerError;
use delay::DelayFilter;
use eat_eof::EatEofFilter;
use hex::ToHexFilter;
use null::NullFilter;
use std::io;
use tap::TapFilter;

/// Builds a filter by its name tag.
///
/// Construction may itself resolve endpoint references: `tap` suspends on
/// the registry until its side-channel endpoint is registered.
pub(crate) async fn make_filter(
    name: &str,
    config: &str,
    registry: &RegistryHandle,
    shutdown: &ShutdownSignal,
) -> Result<Box<dyn ByteFilter>, StreamerError> {
    match name {
        "nullFilter" => Ok(Box::new(NullFilter::new())),
        "toHex" => Ok(Box::new(ToHexFilter::new())),
        "tap" => Ok(Box::new(TapFilter::new(registry.endpoint(config).await?))),
        "eatEOF" => Ok(Box::new(EatEofFilter::new(shutdown.clone()))),
        "delay" => {
            let (chunk_size, delay) =
                delay::parse_config(config).map_err(|reason| StreamerError::InvalidFilterConfig {
                    name: name.to_string(),
                    config: config.to_string(),
                    reason,
                })?;
            Ok(Box::new(DelayFilter::new(chunk_size, delay)))
        }
        _ => Err(StreamerError::UnknownFilter {
            name: name.to_string(),
        }),
    }
}

/// Whether a filter constructor is registered for this name tag.
pub(crate) fn is_known_filter(name: &str) -> bool {
    matches!(name, "nullFilter" | "toHex" | "tap" | "eatEOF" | "delay")
}

/// Error returned when a filter is read before its source was set.
fn source_not_set() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "filter read before source was set")
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::endpoint::ByteSource;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;

    /// Source that yields a fixed sequence of chunks, then end-of-stream.
    /// Chunks must fit the caller's buffer.
    pub(crate) struct ScriptedSource {
        chunks: VecDeque<Vec<u8>>,
    }

    impl ScriptedSource {
        pub(crate) fn new(chunks: &[&[u8]]) -> Self {
            Self {
                chunks: chunks.iter().map(|chunk| chunk.to_vec()).collect(),
            }
        }
    }

    #[async_trait]
    impl ByteSource for ScriptedSource {
        async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    assert!(chunk.len() <= buf.len(), "scripted chunk exceeds read buffer");
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }
    }

    /// Drains a filter or source to end-of-stream using a small buffer.
    pub(crate) async fn drain(source: &mut dyn ByteSource, buf_size: usize) -> Vec<u8> {
        let mut collected = Vec::new();
        let mut buf = vec![0u8; buf_size];
        loop {
            let n = source.read(&mut buf).await.expect("read should succeed");
            if n == 0 {
                return collected;
            }
            collected.extend_from_slice(&buf[..n]);
        }
    }
}
