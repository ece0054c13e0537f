use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Serialize;

use crate::errors::TransportError;
use crate::models::message::Message;

pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Opens the relay's chunked reply for a conversation.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn open(&self, messages: &[Message]) -> Result<ByteStream, TransportError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
}

/// The relay reached over HTTP at `POST {base}/api/chat`.
pub struct HttpRelay {
    client: Client,
    chat_url: String,
}

impl HttpRelay {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            client: Client::builder().build()?,
            chat_url: format!("{}/api/chat", base_url.trim_end_matches('/')),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

#[async_trait]
impl RelayTransport for HttpRelay {
    async fn open(&self, messages: &[Message]) -> Result<ByteStream, TransportError> {
        let response = self
            .client
            .post(&self.chat_url)
            .json(&ChatRequest { messages })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        Ok(response
            .bytes_stream()
            .map_err(TransportError::from)
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_open_streams_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(json!({
                "messages": [{"role": "user", "content": "What is durability?"}]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain; charset=utf-8")
                    .set_body_string("Durability is..."),
            )
            .expect(1)
            .mount(&server)
            .await;

        let relay = HttpRelay::new(&format!("{}/", server.uri())).unwrap();
        let chunks: Vec<Bytes> = relay
            .open(&[Message::user("What is durability?")])
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.concat(), b"Durability is...".to_vec());
    }

    #[tokio::test]
    async fn test_open_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal server error"))
            .mount(&server)
            .await;

        let relay = HttpRelay::new(&server.uri()).unwrap();
        let result = relay.open(&[Message::user("hi")]).await;
        assert!(matches!(result, Err(TransportError::Status(500))));
    }
}
