pub mod anthropic;
pub mod base;
pub mod configs;
pub mod events;
pub mod factory;
pub mod framing;
pub mod sse;
pub mod utils;
