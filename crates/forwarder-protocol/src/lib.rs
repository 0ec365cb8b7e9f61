//! Wire protocol for agent-server communication.
//!
//! Provides:
//! - `Message` - the union over every frame kind on the wire
//! - `codec` - text-frame decoding/encoding
//! - `now_millis` - millisecond timestamps for acks and commands

pub mod codec;
pub mod message;

pub use codec::{DecodeError, decode, encode};
pub use message::{Message, now_millis};
