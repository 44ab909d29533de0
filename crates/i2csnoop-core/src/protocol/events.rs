use serde::{Deserialize, Serialize};

use super::codec::{self, EventKind};
use super::layout;

/// Semantic bus event decoded from a transaction's raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BusEvent {
    Start,
    Stop,
    Data { value: u8, is_address: bool },
    Ack { acked: bool },
}

/// Decode a transaction's raw bytes into bus events, left to right.
///
/// The traversal is finite and restartable: each call starts with a fresh
/// address-expectation flag, so iterators are never shared across
/// transactions.
pub fn decode_events(bytes: &[u8]) -> EventIter<'_> {
    EventIter {
        bytes: bytes.iter(),
        expect_address: false,
    }
}

/// One-pass event traversal; the only state is whether the next data byte
/// carries the target address.
pub struct EventIter<'a> {
    bytes: std::slice::Iter<'a, u8>,
    expect_address: bool,
}

impl Iterator for EventIter<'_> {
    type Item = BusEvent;

    fn next(&mut self) -> Option<BusEvent> {
        loop {
            let byte = *self.bytes.next()?;
            match codec::decode_kind(byte) {
                EventKind::Start => {
                    self.expect_address = true;
                    return Some(BusEvent::Start);
                }
                EventKind::Stop => return Some(BusEvent::Stop),
                EventKind::Data => {
                    let Some(&value) = self.bytes.next() else {
                        log::warn!("data opcode without a value byte at end of transaction");
                        return None;
                    };
                    let is_address = self.expect_address;
                    self.expect_address = false;
                    return Some(BusEvent::Data { value, is_address });
                }
                EventKind::Ack => {
                    return Some(BusEvent::Ack {
                        acked: codec::is_acknowledged(byte),
                    });
                }
                EventKind::Unknown => {
                    log::warn!("skipping unknown event byte {byte:#04x} inside a transaction");
                }
            }
        }
    }
}

/// Encode bus events into their wire framing.
///
/// The inverse of [`decode_events`]; `is_address` is derived during decoding
/// and is not encoded. Used to build test fixtures and replay captures.
pub fn encode_events(events: &[BusEvent]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(events.len() * 2);
    for event in events {
        match *event {
            BusEvent::Start => bytes.push(layout::TAG_START),
            BusEvent::Stop => bytes.push(layout::TAG_STOP),
            BusEvent::Data { value, .. } => {
                bytes.push(layout::TAG_DATA);
                bytes.push(value);
            }
            BusEvent::Ack { acked } => bytes.push(layout::TAG_ACK | u8::from(!acked)),
        }
    }
    bytes
}
