use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{ByteSource, SourceError};

/// Adapts any async byte stream (file, stdin, socket) into a [`ByteSource`],
/// implementing the optional deadline with a timer around the read.
pub struct IoByteSource<R> {
    inner: R,
}

impl<R> IoByteSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ByteSource for IoByteSource<R> {
    async fn read(
        &mut self,
        count: usize,
        deadline: Option<Duration>,
    ) -> Result<Vec<u8>, SourceError> {
        let mut buf = vec![0u8; count];
        let result = match deadline {
            Some(timeout) => tokio::time::timeout(timeout, self.inner.read_exact(&mut buf))
                .await
                .map_err(|_| SourceError::TimedOut { timeout })?,
            None => self.inner.read_exact(&mut buf).await,
        };
        match result {
            Ok(_) => Ok(buf),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => Err(SourceError::Closed),
            Err(err) => Err(SourceError::Io(err)),
        }
    }
}
