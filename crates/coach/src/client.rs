//! The streaming consumer: sends a conversation to the relay and folds the chunked
//! reply into a live assistant message.
pub mod decoder;
pub mod session;
pub mod transport;

pub use session::{ChatSession, ChatSnapshot, IgnoreReason, SendOutcome, FALLBACK_REPLY};
pub use transport::{HttpRelay, RelayTransport};
