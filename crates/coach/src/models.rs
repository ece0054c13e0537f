//! These models represent the conversation passed between the terminal client, the
//! relay and the upstream provider.
//!
//! The wire shape is intentionally the same everywhere: a role and a plain text body.
//! Provider specific formats are converted at the edges in `providers`.
pub mod message;
pub mod role;
