//! Tap filter: mirrors every byte passing through to a side-channel
//! endpoint before handing it downstream.

use crate::endpoint::{ByteFilter, ByteSource, Endpoint};
use async_trait::async_trait;
use std::io;

pub(crate) struct TapFilter {
    source: Option<Box<dyn ByteSource>>,
    tap: Endpoint,
}

impl TapFilter {
    pub(crate) fn new(tap: Endpoint) -> Self {
        Self { source: None, tap }
    }
}

#[async_trait]
impl ByteSource for TapFilter {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let source = self.source.as_mut().ok_or_else(super::source_not_set)?;
        let n = source.read(buf).await?;
        if n == 0 {
            return Ok(0);
        }
        // A failing tap endpoint fails the whole read: the connection must
        // terminate rather than silently drop the mirror.
        self.tap.write_all(&buf[..n]).await?;
        Ok(n)
    }
}

impl ByteFilter for TapFilter {
    fn set_source(&mut self, source: Box<dyn ByteSource>) {
        self.source = Some(source);
    }
}
