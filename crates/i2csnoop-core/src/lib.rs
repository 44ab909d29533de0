//! i2csnoop core library for decoding observed I²C bus activity.
//!
//! This crate implements the trace pipeline used by the CLI: a byte source
//! feeds the transaction reader, which frames event bytes into transactions;
//! the event decoder turns raw bytes into semantic bus events, the address
//! filter decides suppression, and the trace formatter renders numbered
//! lines. Decoding is byte-oriented and side-effect free; all I/O is
//! isolated in `source`. Wire conventions are captured in `protocol::layout`
//! and `protocol::codec` so the event traversal stays minimal.
//!
//! Invariants:
//! - Transactions are processed, filtered, and printed strictly in arrival
//!   order; there is exactly one in-flight source read at a time.
//! - A stalled bus never blocks the pipeline: bounded reads surface partial
//!   transactions instead of waiting forever.
//! - Malformed input is rendered, not dropped; suppression only applies to
//!   well-formed addressed transactions.
//!
//! Version française (résumé):
//! Cette crate fournit le cœur du traceur : source d'octets -> lecteur de
//! transactions -> décodeur d'événements -> filtre d'adresses -> formateur.
//! Les E/S restent dans `source`, les conventions du protocole dans
//! `protocol`. Garanties : ordre strict, pas de blocage sur bus figé, les
//! données malformées restent visibles.
//!
//! # Examples
//! ```
//! use i2csnoop_core::{BusEvent, decode_events, encode_events};
//!
//! let wire = encode_events(&[
//!     BusEvent::Start,
//!     BusEvent::Data { value: 0xA0, is_address: true },
//!     BusEvent::Ack { acked: true },
//!     BusEvent::Stop,
//! ]);
//! let events: Vec<BusEvent> = decode_events(&wire).collect();
//! assert_eq!(
//!     events,
//!     [
//!         BusEvent::Start,
//!         BusEvent::Data { value: 0xA0, is_address: true },
//!         BusEvent::Ack { acked: true },
//!         BusEvent::Stop,
//!     ]
//! );
//! ```

mod filter;
mod protocol;
mod reader;
mod source;
mod trace;

pub use filter::AddressFilter;
pub use protocol::codec::{EventKind, decode_kind, is_acknowledged, is_read, to_seven_bit_address};
pub use protocol::events::{BusEvent, EventIter, decode_events, encode_events};
pub use reader::{DEFAULT_STALL_TIMEOUT, ReadError, Transaction, TransactionReader};
pub use source::{ByteSource, IoByteSource, SourceError};
pub use trace::{TraceStyle, render_json, render_line};
