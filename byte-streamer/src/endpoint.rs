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

//! Byte-stream abstractions: named endpoints and the pull-driven source
//! and filter traits.
//!
//! An [`Endpoint`] is a named, possibly-bidirectional byte stream composed
//! of a read half and a write half. Either half may be a *null half*: a
//! read half that reports end-of-stream immediately, or a write half that
//! accepts and discards all bytes. That composition models OS resources
//! that provide only one direction (a file opened for reading has a null
//! write half) without a separate endpoint shape per direction.
//!
//! Reads and writes go through independent locks, so one task may read an
//! endpoint while another writes it; several tasks sharing the same half
//! simply serialize on its lock.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Boxed read half of an endpoint.
pub type ReadHalf = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed write half of an endpoint.
pub type WriteHalf = Box<dyn AsyncWrite + Send + Unpin>;

/// Read half that reports end-of-stream immediately.
pub fn null_read_half() -> ReadHalf {
    Box::new(tokio::io::empty())
}

/// Write half that accepts and discards all bytes.
pub fn null_write_half() -> WriteHalf {
    Box::new(tokio::io::sink())
}

/// A pull-driven producer of bytes.
///
/// Implemented by [`Endpoint`] (reading its read half) and by every filter,
/// so a connection's composed source is uniformly "something to read from".
/// `Ok(0)` on a non-empty buffer means end-of-stream.
#[async_trait]
pub trait ByteSource: Send {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// A byte transformer layered over an upstream [`ByteSource`].
///
/// The upstream source is set exactly once, by the connection composing the
/// chain, before the first read. Reads on the filter pull from upstream as
/// needed; there is no internal concurrency inside a chain.
pub trait ByteFilter: ByteSource {
    fn set_source(&mut self, source: Box<dyn ByteSource>);
}

/// A named bidirectional byte stream with explicit close.
///
/// Cheap to clone; clones share the same underlying halves. Close is
/// idempotent and shuts down the write half (flushing buffered data and,
/// for sockets, sending a FIN); over a null write half it is a no-op.
#[derive(Clone)]
pub struct Endpoint {
    name: Arc<str>,
    reader: Arc<Mutex<ReadHalf>>,
    writer: Arc<Mutex<WriteHalf>>,
    closed: Arc<AtomicBool>,
}

impl Endpoint {
    pub fn new(name: &str, reader: ReadHalf, writer: WriteHalf) -> Self {
        Self {
            name: Arc::from(name),
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// An endpoint whose both halves are null: reads report end-of-stream,
    /// writes are discarded.
    pub fn null(name: &str) -> Self {
        Self::new(name, null_read_half(), null_write_half())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes the whole buffer to the write half.
    ///
    /// Full-write semantics: partial progress is retried, and a write that
    /// accepts zero bytes surfaces as [`io::ErrorKind::WriteZero`].
    pub async fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(buf).await
    }

    /// Shuts down the write half. Safe to call concurrently with an
    /// in-flight read; only the first call has an effect.
    pub async fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut writer = self.writer.lock().await;
        writer.shutdown().await
    }
}

#[async_trait]
impl ByteSource for Endpoint {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut reader = self.reader.lock().await;
        reader.read(buf).await
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteSource, Endpoint};

    fn loopback(name: &str) -> Endpoint {
        let (a, b) = tokio::io::duplex(64);
        let (read_half, _) = tokio::io::split(b);
        let (_, write_half) = tokio::io::split(a);
        Endpoint::new(name, Box::new(read_half), Box::new(write_half))
    }

    #[tokio::test]
    async fn null_endpoint_reads_eof_and_discards_writes() {
        let mut endpoint = Endpoint::null("nowhere");
        let mut buf = [0u8; 8];

        assert_eq!(endpoint.read(&mut buf).await.unwrap(), 0);
        endpoint.write_all(b"discarded").await.unwrap();
        assert_eq!(endpoint.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_read_and_write_hit_different_halves() {
        let endpoint = loopback("loop");
        let mut reading = endpoint.clone();

        let reader = tokio::spawn(async move {
            let mut buf = [0u8; 8];
            let n = reading.read(&mut buf).await.unwrap();
            buf[..n].to_vec()
        });

        endpoint.write_all(b"ping").await.unwrap();
        assert_eq!(reader.await.unwrap(), b"ping");
    }

    #[tokio::test]
    async fn close_is_idempotent_and_ends_the_stream() {
        let endpoint = loopback("loop");
        endpoint.write_all(b"x").await.unwrap();
        endpoint.close().await.unwrap();
        endpoint.close().await.unwrap();

        let mut reading = endpoint.clone();
        let mut buf = [0u8; 8];
        assert_eq!(reading.read(&mut buf).await.unwrap(), 1);
        assert_eq!(reading.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn write_all_reports_write_zero_on_a_dead_sink() {
        struct DeadSink;

        impl tokio::io::AsyncWrite for DeadSink {
            fn poll_write(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &[u8],
            ) -> std::task::Poll<std::io::Result<usize>> {
                std::task::Poll::Ready(Ok(0))
            }

            fn poll_flush(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }

            fn poll_shutdown(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }
        }

        let endpoint = Endpoint::new("dead", super::null_read_half(), Box::new(DeadSink));
        let error = endpoint.write_all(b"lost").await.unwrap_err();
        assert_eq!(error.kind(), std::io::ErrorKind::WriteZero);
    }
}
