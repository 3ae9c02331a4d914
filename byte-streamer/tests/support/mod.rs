use byte_streamer::{ByteSource, ConnectInfo, Endpoint, EndpointInfo, FilterInfo, Pipeline};
use std::time::Duration;

pub(crate) const IO_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt::try_init();
}

pub(crate) fn endpoint(name: &str, kind: &str, config: &str) -> EndpointInfo {
    EndpointInfo {
        name: name.to_string(),
        kind: kind.to_string(),
        config: config.to_string(),
        depends: None,
    }
}

pub(crate) fn endpoint_depending(
    name: &str,
    kind: &str,
    config: &str,
    depends: &str,
) -> EndpointInfo {
    EndpointInfo {
        depends: Some(depends.to_string()),
        ..endpoint(name, kind, config)
    }
}

pub(crate) fn connect(from: &str, to: &str) -> ConnectInfo {
    connect_via(from, &[], to)
}

pub(crate) fn connect_via(from: &str, filters: &[(&str, &str)], to: &str) -> ConnectInfo {
    ConnectInfo {
        from: from.to_string(),
        to: to.to_string(),
        filters: filters
            .iter()
            .map(|(name, config)| FilterInfo {
                name: name.to_string(),
                config: config.to_string(),
            })
            .collect(),
    }
}

pub(crate) fn pipeline(endpoints: Vec<EndpointInfo>, connections: Vec<ConnectInfo>) -> Pipeline {
    Pipeline {
        endpoints,
        connections,
    }
}

/// A local port that nothing is listening on (yet).
pub(crate) async fn free_port() -> u16 {
    let probe = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("binding a probe listener should succeed");
    probe
        .local_addr()
        .expect("probe listener should report its address")
        .port()
}

/// One read from an endpoint, bounded so a broken pipeline fails the test
/// instead of hanging it.
pub(crate) async fn read_some(endpoint: &mut Endpoint) -> Vec<u8> {
    let mut buf = [0u8; 256];
    let n = tokio::time::timeout(IO_TIMEOUT, endpoint.read(&mut buf))
        .await
        .expect("read should complete before the test timeout")
        .expect("read should succeed");
    buf[..n].to_vec()
}

/// Reads until exactly `expected` bytes have arrived.
pub(crate) async fn read_exactly(endpoint: &mut Endpoint, expected: usize) -> Vec<u8> {
    let mut collected = Vec::new();
    while collected.len() < expected {
        let chunk = read_some(endpoint).await;
        assert!(!chunk.is_empty(), "stream ended before expected bytes");
        collected.extend_from_slice(&chunk);
    }
    assert_eq!(collected.len(), expected, "stream delivered extra bytes");
    collected
}
