mod io;

pub use io::IoByteSource;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Asynchronous upstream byte source.
///
/// `read` resolves with exactly `count` bytes, or with a distinguished
/// timeout result if the deadline elapses first. Without a deadline the wait
/// is unbounded. A timed-out read cancels only that read; the source must
/// remain usable afterwards.
#[async_trait]
pub trait ByteSource {
    async fn read(
        &mut self,
        count: usize,
        deadline: Option<Duration>,
    ) -> Result<Vec<u8>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("read timed out after {timeout:?}")]
    TimedOut { timeout: Duration },
    #[error("byte source closed")]
    Closed,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
