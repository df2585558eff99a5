//! Wire types for the paybridge credential handshake.
//!
//! This crate contains the serde types exchanged between a host page and the
//! remote checkout or setup surface it embeds. These types represent the
//! "protocol layer": the shapes of data as they are posted over the
//! window-messaging and channel-messaging primitives.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: no behavior beyond serialization and classification
//! * 1:1 with the wire: field names match the camelCase keys the remote emits
//! * Stable: changes only when the message vocabulary changes
//!
//! Session orchestration built on top of these types lives in `paybridge`.

pub mod message;
pub mod outcome;

pub use message::*;
pub use outcome::*;
