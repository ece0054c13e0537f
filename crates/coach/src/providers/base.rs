use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::errors::ProviderResult;
use crate::models::message::Message;

/// Text deltas in arrival order. The stream ends when the provider signals completion.
pub type TextStream = BoxStream<'static, ProviderResult<String>>;

/// Base trait for upstream completion providers.
///
/// Implementations own their framing: they turn the provider's byte stream into plain
/// text deltas and nothing else.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Open a single streaming completion for `messages` under the `system` instruction.
    ///
    /// A non-success response from the provider is returned as an error before any
    /// text is produced.
    async fn stream(&self, system: &str, messages: &[Message]) -> ProviderResult<TextStream>;
}
