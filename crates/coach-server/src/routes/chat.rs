use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, TRANSFER_ENCODING},
        HeaderName, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use bytes::Bytes;
use coach::{errors::ProviderError, models::message::Message, providers::base::TextStream};
use futures::{stream::StreamExt, Stream};
use serde::Deserialize;
use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

#[derive(Debug, Deserialize)]
struct ChatRequest {
    messages: Vec<Message>,
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Upstream(#[from] ProviderError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::InvalidRequest(reason) => {
                tracing::warn!(%reason, "rejecting chat request");
                (StatusCode::BAD_REQUEST, "Invalid request").into_response()
            }
            RelayError::Upstream(err) => {
                // the detail stays in the server log
                tracing::error!(error = %err, "chat relay failed before streaming");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

type Chunk = Result<Bytes, io::Error>;

/// Plain text chunked body. Headers turn off caching and proxy buffering so every
/// delta reaches the client as soon as it is written.
pub struct ChunkedResponse {
    rx: ReceiverStream<Chunk>,
}

impl ChunkedResponse {
    fn new(rx: ReceiverStream<Chunk>) -> Self {
        Self { rx }
    }
}

impl Stream for ChunkedResponse {
    type Item = Chunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

impl IntoResponse for ChunkedResponse {
    fn into_response(self) -> Response {
        let body = Body::from_stream(self);

        (
            [
                (CONTENT_TYPE, "text/plain; charset=utf-8"),
                (CACHE_CONTROL, "no-cache"),
                (X_ACCEL_BUFFERING, "no"),
                (TRANSFER_ENCODING, "chunked"),
            ],
            body,
        )
            .into_response()
    }
}

fn parse_request(body: &[u8]) -> Result<Vec<Message>, RelayError> {
    serde_json::from_slice::<ChatRequest>(body)
        .map(|request| request.messages)
        .map_err(|e| RelayError::InvalidRequest(e.to_string()))
}

fn stream_error(kind: io::ErrorKind, message: &str) -> Chunk {
    Err(io::Error::new(kind, message.to_string()))
}

/// Forward upstream deltas to the client until the upstream finishes.
///
/// Stops early when the client goes away, the relay is cancelled, or the upstream
/// is silent for longer than `idle_timeout`. Dropping `upstream` on the way out
/// closes the provider connection. Failures after the response has started are
/// sent as an error chunk so the body is aborted instead of left open.
async fn relay(
    mut upstream: TextStream,
    tx: mpsc::Sender<Chunk>,
    cancel: CancellationToken,
    idle_timeout: Duration,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("relay cancelled");
                let _ = tx.send(stream_error(io::ErrorKind::Interrupted, "relay cancelled")).await;
                break;
            }
            _ = tx.closed() => {
                tracing::info!("client disconnected, closing upstream");
                break;
            }
            next = timeout(idle_timeout, upstream.next()) => match next {
                Ok(Some(Ok(text))) => {
                    if tx.send(Ok(Bytes::from(text))).await.is_err() {
                        tracing::info!("client disconnected, closing upstream");
                        break;
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::error!(error = %e, "upstream failed mid-stream");
                    let _ = tx.send(stream_error(io::ErrorKind::Other, "upstream failed")).await;
                    break;
                }
                Ok(None) => {
                    tracing::debug!("upstream finished");
                    break;
                }
                Err(_) => {
                    tracing::warn!(?idle_timeout, "upstream idle timeout");
                    let _ = tx.send(stream_error(io::ErrorKind::TimedOut, "upstream idle timeout")).await;
                    break;
                }
            }
        }
    }
}

async fn handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<ChunkedResponse, RelayError> {
    let messages = parse_request(&body)?;
    tracing::info!(messages = messages.len(), "relaying chat request");

    let upstream = state
        .provider
        .stream(&state.system_prompt, &messages)
        .await?;

    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);
    tokio::spawn(relay(
        upstream,
        tx,
        state.shutdown.child_token(),
        state.idle_timeout,
    ));

    Ok(ChunkedResponse::new(ReceiverStream::new(rx)))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handler))
        .with_state(state)
}
