//! Identity filter.

use crate::endpoint::{ByteFilter, ByteSource};
use async_trait::async_trait;
use std::io;

pub(crate) struct NullFilter {
    source: Option<Box<dyn ByteSource>>,
}

impl NullFilter {
    pub(crate) fn new() -> Self {
        Self { source: None }
    }
}

#[async_trait]
impl ByteSource for NullFilter {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let source = self.source.as_mut().ok_or_else(super::source_not_set)?;
        source.read(buf).await
    }
}

impl ByteFilter for NullFilter {
    fn set_source(&mut self, source: Box<dyn ByteSource>) {
        self.source = Some(source);
    }
}

#[cfg(test)]
mod tests {
    use super::NullFilter;
    use crate::endpoint::{ByteFilter, ByteSource};
    use crate::filters::testing::ScriptedSource;

    #[tokio::test]
    async fn read_before_set_source_fails() {
        let mut filter = NullFilter::new();
        let mut buf = [0u8; 4];

        let error = filter.read(&mut buf).await.unwrap_err();
        assert_eq!(error.kind(), std::io::ErrorKind::NotConnected);
    }

    #[tokio::test]
    async fn passes_bytes_and_eof_through_unchanged() {
        let mut filter = NullFilter::new();
        filter.set_source(Box::new(ScriptedSource::new(&[b"raw"])));
        let mut buf = [0u8; 8];

        assert_eq!(filter.read(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf[..3], b"raw");
        assert_eq!(filter.read(&mut buf).await.unwrap(), 0);
    }
}
