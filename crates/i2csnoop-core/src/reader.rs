use std::time::Duration;

use thiserror::Error;

use crate::protocol::codec::{self, EventKind};
use crate::protocol::events::{EventIter, decode_events};
use crate::source::{ByteSource, SourceError};

/// Default deadline for reads inside a transaction already in flight.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_millis(300);

/// Raw wire bytes of one observed transaction, bounded by a start condition
/// at the head and terminated by a stop condition (a stalled transaction may
/// be missing its tail).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    bytes: Vec<u8>,
}

impl Transaction {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode this transaction's bytes into bus events.
    pub fn events(&self) -> EventIter<'_> {
        decode_events(&self.bytes)
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    /// A bounded read exceeded the stall deadline. Carries everything
    /// accumulated so far; calling `read_transaction` again resynchronizes
    /// on the next start condition.
    #[error("transaction stalled after {} byte(s)", partial.len())]
    Stalled { partial: Transaction },
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Assembles complete transactions from the upstream event byte stream.
pub struct TransactionReader<S> {
    source: S,
    stall_timeout: Duration,
}

impl<S: ByteSource> TransactionReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }

    pub fn with_stall_timeout(mut self, stall_timeout: Duration) -> Self {
        self.stall_timeout = stall_timeout;
        self
    }

    /// Read one complete transaction.
    ///
    /// Returns `Ok(None)` when the source ends cleanly while no transaction
    /// is in flight (end of a replayed capture). A stall surfaces the
    /// partial transaction without consuming the source; a source failure
    /// mid-transaction is terminal.
    pub async fn read_transaction(&mut self) -> Result<Option<Transaction>, ReadError> {
        let mut bytes = Vec::new();
        // The first byte is awaited without a deadline; every read after it
        // is bounded so a stalled bus surfaces what was captured so far.
        let mut deadline = None;
        loop {
            let byte = match self.read_byte(deadline).await {
                Ok(byte) => byte,
                Err(SourceError::TimedOut { .. }) => {
                    return Err(ReadError::Stalled {
                        partial: Transaction::from_bytes(bytes),
                    });
                }
                Err(SourceError::Closed) if bytes.is_empty() => return Ok(None),
                Err(err) => return Err(ReadError::Source(err)),
            };
            deadline = Some(self.stall_timeout);
            match codec::decode_kind(byte) {
                EventKind::Start | EventKind::Ack => bytes.push(byte),
                EventKind::Data => {
                    bytes.push(byte);
                    match self.read_byte(deadline).await {
                        Ok(value) => bytes.push(value),
                        Err(SourceError::TimedOut { .. }) => {
                            return Err(ReadError::Stalled {
                                partial: Transaction::from_bytes(bytes),
                            });
                        }
                        Err(err) => return Err(ReadError::Source(err)),
                    }
                }
                EventKind::Stop => {
                    bytes.push(byte);
                    return Ok(Some(Transaction::from_bytes(bytes)));
                }
                EventKind::Unknown => {
                    log::warn!("discarding unknown event byte {byte:#04x}");
                }
            }
        }
    }

    async fn read_byte(&mut self, deadline: Option<Duration>) -> Result<u8, SourceError> {
        let bytes = self.source.read(1, deadline).await?;
        bytes.first().copied().ok_or(SourceError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::{ReadError, TransactionReader};
    use crate::source::{IoByteSource, SourceError};

    #[tokio::test]
    async fn reads_complete_transactions_in_order() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(&[0x10, 0x30, 0xA0, 0x40, 0x20, 0x10, 0x20])
            .await
            .unwrap();

        let mut reader = TransactionReader::new(IoByteSource::new(rx));
        let first = reader.read_transaction().await.unwrap().unwrap();
        assert_eq!(first.as_bytes(), [0x10, 0x30, 0xA0, 0x40, 0x20]);
        let second = reader.read_transaction().await.unwrap().unwrap();
        assert_eq!(second.as_bytes(), [0x10, 0x20]);
    }

    #[tokio::test]
    async fn noise_bytes_are_discarded_from_the_frame() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(&[0x00, 0x10, 0x95, 0x30, 0xA0, 0x20])
            .await
            .unwrap();

        let mut reader = TransactionReader::new(IoByteSource::new(rx));
        let xfer = reader.read_transaction().await.unwrap().unwrap();
        assert_eq!(xfer.as_bytes(), [0x10, 0x30, 0xA0, 0x20]);
    }

    #[tokio::test]
    async fn end_of_stream_between_transactions_is_clean() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(&[0x10, 0x20]).await.unwrap();
        drop(tx);

        let mut reader = TransactionReader::new(IoByteSource::new(rx));
        assert!(reader.read_transaction().await.unwrap().is_some());
        assert!(reader.read_transaction().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn end_of_stream_mid_transaction_is_a_source_failure() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(&[0x10, 0x30]).await.unwrap();
        drop(tx);

        let mut reader = TransactionReader::new(IoByteSource::new(rx));
        let err = reader.read_transaction().await.unwrap_err();
        assert!(matches!(
            err,
            ReadError::Source(SourceError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stall_surfaces_partial_bytes_and_reader_recovers() {
        let (mut tx, rx) = tokio::io::duplex(64);
        // A data opcode whose value byte never arrives.
        tx.write_all(&[0x10, 0x30]).await.unwrap();

        let mut reader = TransactionReader::new(IoByteSource::new(rx));
        let err = reader.read_transaction().await.unwrap_err();
        match err {
            ReadError::Stalled { partial } => assert_eq!(partial.as_bytes(), [0x10, 0x30]),
            other => panic!("unexpected error: {other:?}"),
        }

        // The source stays usable: the next call resynchronizes.
        tx.write_all(&[0x10, 0x20]).await.unwrap();
        let xfer = reader.read_transaction().await.unwrap().unwrap();
        assert_eq!(xfer.as_bytes(), [0x10, 0x20]);
    }

    #[tokio::test(start_paused = true)]
    async fn discarded_noise_still_arms_the_stall_deadline() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(&[0x05]).await.unwrap();

        let mut reader = TransactionReader::new(IoByteSource::new(rx));
        let err = reader.read_transaction().await.unwrap_err();
        match err {
            ReadError::Stalled { partial } => assert!(partial.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
