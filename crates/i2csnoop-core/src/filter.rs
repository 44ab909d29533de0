use std::collections::BTreeSet;

use crate::protocol::codec::{self, EventKind};
use crate::reader::Transaction;

/// Suppression decision based on an allow-list of 7-bit target addresses.
///
/// An empty list filters nothing. Malformed transactions are never filtered;
/// visibility is preferred over silent loss.
#[derive(Debug, Clone, Default)]
pub struct AddressFilter {
    allowed: BTreeSet<u8>,
}

impl AddressFilter {
    pub fn from_addresses(addresses: impl IntoIterator<Item = u8>) -> Self {
        Self {
            allowed: addresses.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// True iff this transaction should be suppressed.
    pub fn is_filtered(&self, xfer: &Transaction) -> bool {
        let bytes = xfer.as_bytes();
        match bytes.first().copied() {
            Some(byte) if codec::decode_kind(byte) == EventKind::Start => {}
            Some(byte) => {
                log::warn!("transaction does not begin with a start event: {byte:#04x}");
                return false;
            }
            None => {
                log::warn!("empty transaction cannot carry an address");
                return false;
            }
        }
        if bytes.len() < 3 {
            log::warn!(
                "transaction too short to carry an address ({} byte(s))",
                bytes.len()
            );
            return false;
        }

        let address = codec::to_seven_bit_address(bytes[2]);
        !self.allowed.is_empty() && !self.allowed.contains(&address)
    }
}

#[cfg(test)]
mod tests {
    use super::AddressFilter;
    use crate::reader::Transaction;

    fn xfer(bytes: &[u8]) -> Transaction {
        Transaction::from_bytes(bytes.to_vec())
    }

    #[test]
    fn allow_list_suppresses_other_addresses() {
        let filter = AddressFilter::from_addresses([0x50]);
        // Address byte 0xA2 -> 7-bit address 0x51.
        assert!(filter.is_filtered(&xfer(&[0x10, 0x30, 0xA2, 0x40, 0x20])));
        // Address byte 0xA0 -> 7-bit address 0x50.
        assert!(!filter.is_filtered(&xfer(&[0x10, 0x30, 0xA0, 0x40, 0x20])));
    }

    #[test]
    fn empty_allow_list_filters_nothing() {
        let filter = AddressFilter::default();
        assert!(!filter.is_filtered(&xfer(&[0x10, 0x30, 0xA2, 0x20])));
        assert!(!filter.is_filtered(&xfer(&[0x40])));
        assert!(!filter.is_filtered(&xfer(&[])));
    }

    #[test]
    fn malformed_transactions_are_never_filtered() {
        let filter = AddressFilter::from_addresses([0x50]);
        // No leading start event.
        assert!(!filter.is_filtered(&xfer(&[0x40, 0x30, 0xA2, 0x20])));
        // Too short to contain an address byte.
        assert!(!filter.is_filtered(&xfer(&[0x10, 0x20])));
        assert!(!filter.is_filtered(&xfer(&[])));
    }
}
