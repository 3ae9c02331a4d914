//! Hex-encoding filter: each input byte becomes two lowercase hex digits.

use crate::endpoint::{ByteFilter, ByteSource};
use async_trait::async_trait;
use std::io;

const READ_CHUNK: usize = 128;
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

pub(crate) struct ToHexFilter {
    source: Option<Box<dyn ByteSource>>,
    input: [u8; READ_CHUNK],
    // Encoded output not yet delivered downstream.
    pending: Vec<u8>,
    cursor: usize,
}

impl ToHexFilter {
    pub(crate) fn new() -> Self {
        Self {
            source: None,
            input: [0; READ_CHUNK],
            pending: Vec::with_capacity(READ_CHUNK * 2),
            cursor: 0,
        }
    }
}

#[async_trait]
impl ByteSource for ToHexFilter {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.cursor == self.pending.len() {
            let source = self.source.as_mut().ok_or_else(super::source_not_set)?;
            let n = source.read(&mut self.input).await?;
            if n == 0 {
                // End-of-stream propagates immediately; there is no partial
                // state to flush, every consumed byte is already encoded.
                return Ok(0);
            }
            self.pending.clear();
            self.cursor = 0;
            for &byte in &self.input[..n] {
                self.pending.push(HEX_DIGITS[usize::from(byte >> 4)]);
                self.pending.push(HEX_DIGITS[usize::from(byte & 0xf)]);
            }
        }

        let n = buf.len().min(self.pending.len() - self.cursor);
        buf[..n].copy_from_slice(&self.pending[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}

impl ByteFilter for ToHexFilter {
    fn set_source(&mut self, source: Box<dyn ByteSource>) {
        self.source = Some(source);
    }
}
