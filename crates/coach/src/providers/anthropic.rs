use async_trait::async_trait;
use reqwest::Client;

use super::base::{Provider, TextStream};
use super::configs::AnthropicProviderConfig;
use super::framing::{decode_text_deltas, EventStreamDecoder};
use super::utils::{create_request_payload, post_stream, streaming_client};
use crate::errors::ProviderResult;
use crate::models::message::Message;

/// Reads the provider's native structured event stream.
pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> ProviderResult<Self> {
        Ok(Self {
            client: streaming_client()?,
            config,
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn stream(&self, system: &str, messages: &[Message]) -> ProviderResult<TextStream> {
        let payload = create_request_payload(&self.config, system, messages);
        let response = post_stream(&self.client, &self.config, &payload).await?;
        tracing::debug!(model = %self.config.model, "upstream event stream opened");

        Ok(decode_text_deltas(
            response.bytes_stream(),
            EventStreamDecoder::default(),
        ))
    }
}
