//! Wire protocol decoding modules.
//!
//! The protocol follows a layered structure:
//! - `layout`: event tags and bit masks (source of truth)
//! - `codec`: tag and bit conventions over single bytes
//! - `events`: domain-level decoding (no direct mask arithmetic)
//!
//! All layers are pure and contain no I/O; the reader and the CLI handle
//! byte transport and output.

pub mod codec;
pub mod events;
pub mod layout;
