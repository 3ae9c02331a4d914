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

//! Connection pump: one task per configured connection.
//!
//! A pump resolves its source endpoint, composes the filter chain over it
//! in declaration order, resolves its destination endpoint, and then copies
//! bytes until end-of-stream or the first error. Both are terminal: the
//! pump publishes the error on the shared channel and exits; recovery is
//! the supervisor's call (there is none — first error shuts the pipeline
//! down).

use crate::broker::{RegistryHandle, ShutdownSignal};
use crate::endpoint::{ByteSource, Endpoint};
use crate::error::StreamerError;
use crate::filters;
use crate::observability::{events, fields};
use crate::pipeline::ConnectInfo;
use std::io;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const COMPONENT: &str = "connection";

/// Fixed copy-loop buffer size.
const COPY_BUFFER_SIZE: usize = 1024;

/// Runs one connection to completion and reports its terminal error.
pub(crate) async fn run_connection(
    info: ConnectInfo,
    registry: RegistryHandle,
    shutdown: ShutdownSignal,
    errors: mpsc::Sender<StreamerError>,
) {
    let label = fields::connection_label(&info.from, &info.to);
    debug!(
        event = events::CONNECTION_OPEN_START,
        component = COMPONENT,
        connection = label.as_str(),
        filters = info.filters.len(),
        "making connection"
    );

    let error = pump(&info, &label, &registry, &shutdown).await;
    warn!(
        event = events::CONNECTION_FAILED,
        component = COMPONENT,
        connection = label.as_str(),
        err = %error,
        "connection terminated"
    );
    let _ = errors.send(error).await;
}

async fn pump(
    info: &ConnectInfo,
    label: &str,
    registry: &RegistryHandle,
    shutdown: &ShutdownSignal,
) -> StreamerError {
    let from = match registry.endpoint(&info.from).await {
        Ok(endpoint) => endpoint,
        Err(error) => return error,
    };

    let mut source: Box<dyn ByteSource> = Box::new(from);
    for filter_info in &info.filters {
        let mut filter =
            match filters::make_filter(&filter_info.name, &filter_info.config, registry, shutdown)
                .await
            {
                Ok(filter) => filter,
                Err(error) => return error,
            };
        filter.set_source(source);
        source = filter;
    }

    let to = match registry.endpoint(&info.to).await {
        Ok(endpoint) => endpoint,
        Err(error) => return error,
    };

    debug!(
        event = events::CONNECTION_ESTABLISHED,
        component = COMPONENT,
        connection = label,
        "connection made"
    );

    copy_bytes(source.as_mut(), &to, label).await
}

/// Copies bytes from the composed source into the destination endpoint
/// until the terminal event: end-of-stream, read error, write error, or
/// short write.
async fn copy_bytes(source: &mut dyn ByteSource, to: &Endpoint, label: &str) -> StreamerError {
    let mut buffer = [0u8; COPY_BUFFER_SIZE];
    loop {
        let read = match source.read(&mut buffer).await {
            Ok(0) => {
                return StreamerError::EndOfStream {
                    context: format!("connection {label}"),
                }
            }
            Ok(n) => n,
            Err(cause) => {
                return StreamerError::io(format!("reading on connection {label}"), cause)
            }
        };

        if let Err(error) = to.write_all(&buffer[..read]).await {
            return match error.kind() {
                io::ErrorKind::WriteZero => StreamerError::ShortWrite {
                    context: format!("connection {label}"),
                },
                _ => StreamerError::io(format!("writing on connection {label}"), error),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::copy_bytes;
    use crate::endpoint::{null_read_half, ByteSource, Endpoint};
    use crate::error::StreamerError;
    use crate::filters::testing::ScriptedSource;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    fn loopback(name: &str) -> Endpoint {
        let (a, b) = tokio::io::duplex(256);
        let (read_half, _) = tokio::io::split(b);
        let (_, write_half) = tokio::io::split(a);
        Endpoint::new(name, Box::new(read_half), Box::new(write_half))
    }

    #[tokio::test]
    async fn copies_until_eof_then_reports_end_of_stream() {
        let mut source = ScriptedSource::new(&[b"first ", b"second"]);
        let destination = loopback("dest");

        let error = copy_bytes(&mut source, &destination, "[a -> b]").await;
        assert!(matches!(error, StreamerError::EndOfStream { .. }));

        let mut reading = destination.clone();
        let mut buf = [0u8; 32];
        let mut collected = Vec::new();
        while collected.len() < 12 {
            let n = reading.read(&mut buf).await.unwrap();
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"first second");
    }

    #[tokio::test]
    async fn zero_accepting_destination_is_a_short_write() {
        struct ZeroSink;

        impl tokio::io::AsyncWrite for ZeroSink {
            fn poll_write(
                self: Pin<&mut Self>,
                _cx: &mut Context<'_>,
                _buf: &[u8],
            ) -> Poll<std::io::Result<usize>> {
                Poll::Ready(Ok(0))
            }

            fn poll_flush(
                self: Pin<&mut Self>,
                _cx: &mut Context<'_>,
            ) -> Poll<std::io::Result<()>> {
                Poll::Ready(Ok(()))
            }

            fn poll_shutdown(
                self: Pin<&mut Self>,
                _cx: &mut Context<'_>,
            ) -> Poll<std::io::Result<()>> {
                Poll::Ready(Ok(()))
            }
        }

        let mut source = ScriptedSource::new(&[b"lost bytes"]);
        let destination = Endpoint::new("sink", null_read_half(), Box::new(ZeroSink));

        let error = copy_bytes(&mut source, &destination, "[a -> sink]").await;
        assert!(matches!(error, StreamerError::ShortWrite { .. }));
    }
}
