//! Pacing filter: sleeps before each upstream fetch of at most
//! `chunksize` bytes, then drains the chunk across subsequent reads.

use crate::endpoint::{ByteFilter, ByteSource};
use async_trait::async_trait;
use std::io;
use std::time::Duration;

pub(crate) struct DelayFilter {
    source: Option<Box<dyn ByteSource>>,
    delay: Duration,
    chunk: Box<[u8]>,
    filled: usize,
    cursor: usize,
}

impl DelayFilter {
    pub(crate) fn new(chunk_size: usize, delay: Duration) -> Self {
        Self {
            source: None,
            delay,
            chunk: vec![0; chunk_size].into_boxed_slice(),
            filled: 0,
            cursor: 0,
        }
    }
}

/// Parses a `chunksize,delayMS` config string.
pub(crate) fn parse_config(config: &str) -> Result<(usize, Duration), String> {
    let Some((chunk_text, delay_text)) = config.split_once(',') else {
        return Err("expected chunksize,delayMS".to_string());
    };
    let chunk_size: usize = chunk_text
        .trim()
        .parse()
        .map_err(|_| format!("invalid chunk size: {chunk_text}"))?;
    if chunk_size == 0 {
        return Err("chunk size must be at least 1".to_string());
    }
    let delay_ms: u64 = delay_text
        .trim()
        .parse()
        .map_err(|_| format!("invalid delay: {delay_text}"))?;
    Ok((chunk_size, Duration::from_millis(delay_ms)))
}

#[async_trait]
impl ByteSource for DelayFilter {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.cursor == self.filled {
            // The delay gates the next fetch, not the current delivery.
            tokio::time::sleep(self.delay).await;
            let source = self.source.as_mut().ok_or_else(super::source_not_set)?;
            let n = source.read(&mut self.chunk).await?;
            if n == 0 {
                return Ok(0);
            }
            self.filled = n;
            self.cursor = 0;
        }

        let n = buf.len().min(self.filled - self.cursor);
        buf[..n].copy_from_slice(&self.chunk[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}

impl ByteFilter for DelayFilter {
    fn set_source(&mut self, source: Box<dyn ByteSource>) {
        self.source = Some(source);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_config, DelayFilter};
    use crate::endpoint::{ByteFilter, ByteSource};
    use crate::filters::testing::{drain, ScriptedSource};
    use std::time::Duration;

    #[test]
    fn parses_chunk_size_and_delay() {
        assert_eq!(
            parse_config("1,100").unwrap(),
            (1, Duration::from_millis(100))
        );
        assert_eq!(
            parse_config(" 16 , 250 ").unwrap(),
            (16, Duration::from_millis(250))
        );
    }

    #[test]
    fn rejects_malformed_configs() {
        assert!(parse_config("").is_err());
        assert!(parse_config("100").is_err());
        assert!(parse_config("a,b").is_err());
        assert!(parse_config("0,100").is_err());
        assert!(parse_config("1,-5").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_in_chunks_without_losing_bytes() {
        let mut filter = DelayFilter::new(2, Duration::from_millis(100));
        filter.set_source(Box::new(ScriptedSource::new(&[b"ab", b"cd", b"e"])));

        assert_eq!(drain(&mut filter, 8).await, b"abcde");
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_before_every_upstream_fetch() {
        let mut filter = DelayFilter::new(1, Duration::from_millis(100));
        filter.set_source(Box::new(ScriptedSource::new(&[b"x", b"y"])));

        let started = tokio::time::Instant::now();
        let mut buf = [0u8; 4];
        assert_eq!(filter.read(&mut buf).await.unwrap(), 1);
        assert_eq!(filter.read(&mut buf).await.unwrap(), 1);
        assert_eq!(filter.read(&mut buf).await.unwrap(), 0);

        // Two data fetches plus the EOF fetch, each gated by the delay.
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
