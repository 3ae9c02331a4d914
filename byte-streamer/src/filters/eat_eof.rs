//! Filter that refuses to propagate end-of-stream, holding its connection
//! open until the pipeline shuts down.

use crate::broker::ShutdownSignal;
use crate::endpoint::{ByteFilter, ByteSource};
use async_trait::async_trait;
use std::io;

pub(crate) struct EatEofFilter {
    source: Option<Box<dyn ByteSource>>,
    shutdown: ShutdownSignal,
}

impl EatEofFilter {
    pub(crate) fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            source: None,
            shutdown,
        }
    }
}

#[async_trait]
impl ByteSource for EatEofFilter {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let source = self.source.as_mut().ok_or_else(super::source_not_set)?;
        let n = source.read(buf).await?;
        if n > 0 {
            return Ok(n);
        }
        // Upstream ended, but this connection is held open. Wait for the
        // supervisor's shutdown signal instead of reporting end-of-stream.
        self.shutdown.triggered().await;
        Err(io::Error::new(
            io::ErrorKind::Interrupted,
            "held-open stream interrupted by shutdown",
        ))
    }
}

impl ByteFilter for EatEofFilter {
    fn set_source(&mut self, source: Box<dyn ByteSource>) {
        self.source = Some(source);
    }
}

#[cfg(test)]
mod tests {
    use super::EatEofFilter;
    use crate::broker::ShutdownSignal;
    use crate::endpoint::{ByteFilter, ByteSource};
    use crate::filters::testing::ScriptedSource;
    use std::time::Duration;

    #[tokio::test]
    async fn passes_data_through_until_upstream_ends() {
        let (_shutdown_tx, shutdown) = ShutdownSignal::new();
        let mut filter = EatEofFilter::new(shutdown);
        filter.set_source(Box::new(ScriptedSource::new(&[b"still here"])));
        let mut buf = [0u8; 16];

        assert_eq!(filter.read(&mut buf).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn holds_the_stream_open_past_eof_until_shutdown() {
        let (shutdown_tx, shutdown) = ShutdownSignal::new();
        let mut filter = EatEofFilter::new(shutdown);
        filter.set_source(Box::new(ScriptedSource::new(&[])));
        let mut buf = [0u8; 16];

        // Upstream is already at EOF, but the read must keep suspending.
        let pending = tokio::time::timeout(Duration::from_millis(50), filter.read(&mut buf)).await;
        assert!(pending.is_err());

        shutdown_tx.send(true).unwrap();
        let error = filter.read(&mut buf).await.unwrap_err();
        assert_eq!(error.kind(), std::io::ErrorKind::Interrupted);
    }
}
