use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;

use super::configs::AnthropicProviderConfig;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::message::Message;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Streams can legitimately run for minutes, so only connecting is bounded here.
/// Idle reads are bounded by the relay.
pub fn streaming_client() -> ProviderResult<Client> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .build()?)
}

/// Convert internal messages to the Messages API specification
pub fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role.as_str(),
                "content": message.content,
            })
        })
        .collect()
}

pub fn create_request_payload(
    config: &AnthropicProviderConfig,
    system: &str,
    messages: &[Message],
) -> Value {
    let mut payload = json!({
        "model": config.model,
        "max_tokens": config.max_tokens,
        "system": system,
        "messages": messages_to_anthropic_spec(messages),
        "stream": true,
    });

    if let (Some(temperature), Some(object)) = (config.temperature, payload.as_object_mut()) {
        object.insert("temperature".to_string(), json!(temperature));
    }

    payload
}

/// Send a streaming completion request. Any non-success status is turned into
/// [`ProviderError::Upstream`] after reading the error body.
pub async fn post_stream(
    client: &Client,
    config: &AnthropicProviderConfig,
    payload: &Value,
) -> ProviderResult<Response> {
    let url = format!("{}/v1/messages", config.host.trim_end_matches('/'));

    let response = client
        .post(&url)
        .header("x-api-key", &config.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("accept", "text/event-stream")
        .json(payload)
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
    Err(ProviderError::Upstream {
        status: status.as_u16(),
        body,
    })
}
