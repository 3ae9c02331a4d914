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

//! Endpoint factory: maps a kind tag to an asynchronous constructor.
//!
//! Each constructor runs as its own task and may block on I/O for as long
//! as it needs (`socketListen` sits in accept until a client arrives). A
//! constructor publishes exactly one endpoint on the announce channel or
//! exactly one error on the error channel; the `process` kind additionally
//! stays alive for the child's lifetime and surfaces its eventual exit on
//! the error channel (clean exit reads as end-of-stream).

use crate::endpoint::{null_read_half, null_write_half, Endpoint};
use crate::error::StreamerError;
use crate::observability::{events, fields};
use crate::pipeline::EndpointInfo;
use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, warn};

const COMPONENT: &str = "endpoint_factory";

/// Size of the in-memory loopback buffer backing `echo` endpoints.
const ECHO_CAPACITY: usize = 1024;

/// Chunk size used when pumping child process output.
const PUMP_CHUNK: usize = 1024;

/// Whether an endpoint constructor is registered for this kind tag.
pub(crate) fn is_known_kind(kind: &str) -> bool {
    matches!(
        kind,
        "echo"
            | "null"
            | "socketConnect"
            | "socketListen"
            | "fileReader"
            | "fileWriter"
            | "fileAppender"
            | "stdio"
            | "stderr"
            | "serialPort"
            | "process"
    )
}

/// Starts the constructor task for one declared endpoint.
///
/// An unknown kind is a configuration error and is returned synchronously;
/// every other failure is asynchronous and arrives on the error channel.
pub(crate) fn spawn_endpoint(
    info: EndpointInfo,
    announce: mpsc::Sender<Endpoint>,
    errors: mpsc::Sender<StreamerError>,
) -> Result<(), StreamerError> {
    if !is_known_kind(&info.kind) {
        return Err(StreamerError::UnknownEndpointKind {
            kind: info.kind.clone(),
        });
    }

    debug!(
        event = events::ENDPOINT_CREATE_START,
        component = COMPONENT,
        endpoint = info.name.as_str(),
        declaration = fields::endpoint_label(&info.kind, &info.config).as_str(),
        "creating endpoint"
    );

    tokio::spawn(async move {
        match construct(&info).await {
            Ok(Construction::Ready(endpoint)) => {
                let _ = announce.send(endpoint).await;
            }
            Ok(Construction::Process { endpoint, child }) => {
                // The endpoint is announced before the child terminates so
                // connections can attach to its pipes.
                let _ = announce.send(endpoint).await;
                let error = wait_for_child(child, &info.config).await;
                let _ = errors.send(error).await;
            }
            Err(error) => {
                warn!(
                    event = events::ENDPOINT_CREATE_FAILED,
                    component = COMPONENT,
                    endpoint = info.name.as_str(),
                    err = %error,
                    "endpoint construction failed"
                );
                let _ = errors.send(error).await;
            }
        }
    });

    Ok(())
}

enum Construction {
    Ready(Endpoint),
    Process { endpoint: Endpoint, child: Child },
}

async fn construct(info: &EndpointInfo) -> Result<Construction, StreamerError> {
    let name = info.name.as_str();
    let config = info.config.as_str();

    let endpoint = match info.kind.as_str() {
        "echo" => {
            let (near, far) = tokio::io::duplex(ECHO_CAPACITY);
            let (read_half, _) = tokio::io::split(far);
            let (_, write_half) = tokio::io::split(near);
            Endpoint::new(name, Box::new(read_half), Box::new(write_half))
        }

        "null" => Endpoint::null(name),

        "socketConnect" => {
            let stream = TcpStream::connect(config)
                .await
                .map_err(|e| StreamerError::io(format!("connecting to {config}"), e))?;
            let (read_half, write_half) = stream.into_split();
            Endpoint::new(name, Box::new(read_half), Box::new(write_half))
        }

        "socketListen" => {
            let addr = normalize_listen_addr(config);
            let listener = TcpListener::bind(&addr)
                .await
                .map_err(|e| StreamerError::io(format!("binding listener on {addr}"), e))?;
            // Exactly one client; the listener is released after accept.
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|e| StreamerError::io(format!("accepting on {addr}"), e))?;
            let (read_half, write_half) = stream.into_split();
            Endpoint::new(name, Box::new(read_half), Box::new(write_half))
        }

        "fileReader" => {
            let file = tokio::fs::File::open(config)
                .await
                .map_err(|e| StreamerError::io(format!("opening {config} for reading"), e))?;
            Endpoint::new(name, Box::new(file), null_write_half())
        }

        "fileWriter" => {
            let file = tokio::fs::File::create(config)
                .await
                .map_err(|e| StreamerError::io(format!("creating {config}"), e))?;
            Endpoint::new(name, null_read_half(), Box::new(file))
        }

        "fileAppender" => {
            let file = tokio::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(config)
                .await
                .map_err(|e| StreamerError::io(format!("opening {config} for append"), e))?;
            Endpoint::new(name, null_read_half(), Box::new(file))
        }

        "stdio" => Endpoint::new(
            name,
            Box::new(tokio::io::stdin()),
            Box::new(tokio::io::stdout()),
        ),

        "stderr" => Endpoint::new(name, null_read_half(), Box::new(tokio::io::stderr())),

        "serialPort" => {
            let (device, baud) = parse_serial_config(info)?;
            let stream = tokio_serial::new(device, baud)
                .open_native_async()
                .map_err(|e| {
                    StreamerError::io(format!("opening serial port {device}"), io::Error::other(e))
                })?;
            let (read_half, write_half) = tokio::io::split(stream);
            Endpoint::new(name, Box::new(read_half), Box::new(write_half))
        }

        "process" => return construct_process(info),

        // spawn_endpoint has already rejected unknown kinds.
        other => {
            return Err(StreamerError::UnknownEndpointKind {
                kind: other.to_string(),
            })
        }
    };

    Ok(Construction::Ready(endpoint))
}

fn construct_process(info: &EndpointInfo) -> Result<Construction, StreamerError> {
    let mut words = info.config.split_whitespace();
    let Some(program) = words.next() else {
        return Err(StreamerError::InvalidEndpointConfig {
            kind: info.kind.clone(),
            config: info.config.clone(),
            reason: "empty command line".to_string(),
        });
    };

    let mut child = Command::new(program)
        .args(words)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| StreamerError::io(format!("spawning process `{}`", info.config), e))?;

    let stdin = take_pipe(child.stdin.take(), "stdin")?;
    let stdout = take_pipe(child.stdout.take(), "stdout")?;
    let stderr = take_pipe(child.stderr.take(), "stderr")?;

    // The child's stderr is merged into its stdout: both pump into the one
    // channel the endpoint's read half drains.
    let (chunks_tx, chunks_rx) = mpsc::channel(4);
    tokio::spawn(pump_into(stdout, chunks_tx.clone()));
    tokio::spawn(pump_into(stderr, chunks_tx));

    let endpoint = Endpoint::new(
        &info.name,
        Box::new(ChannelReader::new(chunks_rx)),
        Box::new(stdin),
    );
    Ok(Construction::Process { endpoint, child })
}

fn take_pipe<T>(pipe: Option<T>, which: &str) -> Result<T, StreamerError> {
    pipe.ok_or_else(|| {
        StreamerError::io(
            format!("capturing child {which}"),
            io::Error::new(io::ErrorKind::BrokenPipe, "pipe was not opened"),
        )
    })
}

async fn wait_for_child(mut child: Child, command: &str) -> StreamerError {
    match child.wait().await {
        Ok(status) if status.success() => {
            debug!(
                event = events::PROCESS_EXIT,
                component = COMPONENT,
                command,
                "child exited cleanly"
            );
            StreamerError::EndOfStream {
                context: format!("process `{command}`"),
            }
        }
        Ok(status) => StreamerError::ProcessExited {
            command: command.to_string(),
            status,
        },
        Err(source) => StreamerError::io(format!("waiting on process `{command}`"), source),
    }
}

/// Accepts the bare `:port` listen form by binding all interfaces.
fn normalize_listen_addr(config: &str) -> String {
    if config.starts_with(':') {
        format!("0.0.0.0{config}")
    } else {
        config.to_string()
    }
}

fn parse_serial_config(info: &EndpointInfo) -> Result<(&str, u32), StreamerError> {
    let invalid = |reason: String| StreamerError::InvalidEndpointConfig {
        kind: info.kind.clone(),
        config: info.config.clone(),
        reason,
    };

    let Some((device, baud_text)) = info.config.split_once(',') else {
        return Err(invalid("expected device,baud".to_string()));
    };
    let baud: u32 = baud_text
        .trim()
        .parse()
        .map_err(|_| invalid(format!("invalid baud rate: {baud_text}")))?;
    Ok((device.trim(), baud))
}

async fn pump_into(mut reader: impl AsyncRead + Unpin, chunks: mpsc::Sender<Vec<u8>>) {
    let mut buf = [0u8; PUMP_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                if chunks.send(buf[..n].to_vec()).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Read half backed by a chunk channel; reports end-of-stream once every
/// sender is gone and the buffered chunks are drained.
struct ChannelReader {
    chunks: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
    cursor: usize,
}

impl ChannelReader {
    fn new(chunks: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            chunks,
            pending: Vec::new(),
            cursor: 0,
        }
    }
}

impl AsyncRead for ChannelReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if this.cursor < this.pending.len() {
                let n = buf.remaining().min(this.pending.len() - this.cursor);
                buf.put_slice(&this.pending[this.cursor..this.cursor + n]);
                this.cursor += n;
                return Poll::Ready(Ok(()));
            }
            match this.chunks.poll_recv(cx) {
                Poll::Ready(Some(chunk)) => {
                    this.pending = chunk;
                    this.cursor = 0;
                }
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
