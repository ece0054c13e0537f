//! Frame decoding for upstream event streams.
//!
//! Network reads do not respect frame boundaries, so both decoders keep the partial
//! trailing line as raw bytes and only turn complete lines into text. A multi-byte
//! character split across two reads is therefore never decoded early.
use bytes::Bytes;
use futures::{Stream, StreamExt};
use memchr::memchr;

use super::base::TextStream;
use super::events::StreamEvent;
use crate::errors::ProviderError;

/// Terminator some integrations send as a final `data:` payload.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One discrete event unit from the upstream stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Name from an `event:` line, when the framing carries one.
    pub event: Option<String>,
    pub data: String,
}

/// Splits raw upstream bytes into frames.
pub trait FrameDecoder: Send {
    /// Feed one network read and return every frame it completed.
    fn push(&mut self, chunk: &[u8]) -> Vec<Frame>;

    /// Flush whatever is left once the upstream reaches EOF.
    fn finish(&mut self) -> Vec<Frame>;
}

#[derive(Debug, Default)]
struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<String> {
        let newline_pos = memchr(b'\n', &self.buffer)?;
        let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(Self::decode(&line[..newline_pos]))
    }

    fn take_rest(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(Self::decode(&rest))
    }

    fn decode(line: &[u8]) -> String {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        String::from_utf8_lossy(line).into_owned()
    }
}

fn data_value(line: &str) -> Option<&str> {
    let value = line.strip_prefix("data:")?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}

/// Newline-delimited `data: <json>` records. Every other line is ignored.
#[derive(Debug, Default)]
pub struct DataLineDecoder {
    lines: LineBuffer,
}

impl DataLineDecoder {
    fn frame(line: &str) -> Option<Frame> {
        let data = data_value(line)?.trim();
        if data.is_empty() {
            return None;
        }
        Some(Frame {
            event: None,
            data: data.to_string(),
        })
    }
}

impl FrameDecoder for DataLineDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.lines.extend(chunk);
        let mut frames = Vec::new();
        while let Some(line) = self.lines.next_line() {
            frames.extend(Self::frame(&line));
        }
        frames
    }

    fn finish(&mut self) -> Vec<Frame> {
        self.lines
            .take_rest()
            .and_then(|line| Self::frame(&line))
            .into_iter()
            .collect()
    }
}

/// Structured event stream: `event:` and `data:` lines grouped into blocks that end
/// with a blank line. Multiple `data:` lines in one block are joined with `\n`.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    lines: LineBuffer,
    current: Frame,
}

impl EventStreamDecoder {
    fn feed_line(&mut self, line: &str) -> Option<Frame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(value) = line.strip_prefix("event:") {
            self.current.event = Some(value.trim().to_string());
        } else if let Some(value) = data_value(line) {
            if !self.current.data.is_empty() {
                self.current.data.push('\n');
            }
            self.current.data.push_str(value);
        }
        // id:, retry: and `:` comments carry nothing we need
        None
    }

    fn dispatch(&mut self) -> Option<Frame> {
        let frame = std::mem::take(&mut self.current);
        if frame.data.is_empty() {
            None
        } else {
            Some(frame)
        }
    }
}

impl FrameDecoder for EventStreamDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.lines.extend(chunk);
        let mut frames = Vec::new();
        while let Some(line) = self.lines.next_line() {
            frames.extend(self.feed_line(&line));
        }
        frames
    }

    fn finish(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        if let Some(line) = self.lines.take_rest() {
            frames.extend(self.feed_line(&line));
        }
        frames.extend(self.dispatch());
        frames
    }
}

enum Step {
    Text(String),
    Skip,
    Stop,
}

fn interpret(frame: &Frame) -> Result<Step, ProviderError> {
    let payload = frame.data.trim();
    if payload == DONE_SENTINEL {
        return Ok(Step::Skip);
    }

    let event: StreamEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(error = %err, event = ?frame.event, "discarding unparseable frame");
            return Ok(Step::Skip);
        }
    };

    match event {
        StreamEvent::ContentBlockDelta { .. } => match event.text_delta() {
            Some(text) if !text.is_empty() => Ok(Step::Text(text.to_string())),
            _ => Ok(Step::Skip),
        },
        StreamEvent::MessageStop => Ok(Step::Stop),
        StreamEvent::Error { error } => Err(ProviderError::Stream {
            kind: error.kind,
            message: error.message,
        }),
        _ => Ok(Step::Skip),
    }
}

/// Turn an upstream byte stream into the text deltas it carries.
///
/// Each delta is yielded as soon as its frame completes. Unparseable frames are
/// dropped; an upstream `error` event or a failed read ends the stream with an error.
pub fn decode_text_deltas<S, E, D>(bytes: S, mut decoder: D) -> TextStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ProviderError> + Send + 'static,
    D: FrameDecoder + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut eof = false;
        'read: while !eof {
            let frames = match bytes.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(Into::<ProviderError>::into)?;
                    decoder.push(&chunk)
                }
                None => {
                    eof = true;
                    decoder.finish()
                }
            };

            for frame in frames {
                match interpret(&frame)? {
                    Step::Text(text) => yield text,
                    Step::Skip => {}
                    Step::Stop => break 'read,
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    fn delta(text: &str) -> String {
        json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": text}
        })
        .to_string()
    }

    fn event_stream_body(deltas: &[&str]) -> String {
        let mut body = String::new();
        body.push_str("event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n");
        body.push_str("event: content_block_start\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n");
        body.push_str("event: ping\ndata: {\"type\": \"ping\"}\n\n");
        for text in deltas {
            body.push_str(&format!("event: content_block_delta\ndata: {}\n\n", delta(text)));
        }
        body.push_str("event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":0}\n\n");
        body.push_str("event: message_delta\ndata: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}\n\n");
        body.push_str("event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n");
        body
    }

    fn data_line_body(deltas: &[&str]) -> String {
        let mut body = String::new();
        body.push_str("data: {\"type\":\"message_start\",\"message\":{}}\n\n");
        for text in deltas {
            body.push_str(&format!("data: {}\n\n", delta(text)));
        }
        body.push_str("data: {\"type\":\"message_stop\"}\n\n");
        body.push_str("data: [DONE]\n\n");
        body
    }

    async fn collect<D: FrameDecoder + 'static>(
        chunks: Vec<Vec<u8>>,
        decoder: D,
    ) -> Result<String, ProviderError> {
        let bytes = stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, ProviderError>(Bytes::from(chunk))),
        );
        let mut deltas = decode_text_deltas(bytes, decoder);
        let mut out = String::new();
        while let Some(text) = deltas.next().await {
            out.push_str(&text?);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn test_event_stream_concatenates_text_deltas() {
        let body = event_stream_body(&["Dur", "ability ", "is..."]);
        let text = collect(vec![body.into_bytes()], EventStreamDecoder::default())
            .await
            .unwrap();
        assert_eq!(text, "Durability is...");
    }

    #[tokio::test]
    async fn test_data_lines_skip_done_sentinel() {
        let body = data_line_body(&["Dur", "ability ", "is..."]);
        let text = collect(vec![body.into_bytes()], DataLineDecoder::default())
            .await
            .unwrap();
        assert_eq!(text, "Durability is...");
    }

    #[tokio::test]
    async fn test_frame_split_at_every_offset() {
        let event_body = event_stream_body(&["Dur", "ability ", "is ", "résumé ✓"]).into_bytes();
        let line_body = data_line_body(&["Dur", "ability ", "is ", "résumé ✓"]).into_bytes();

        for split in 0..=event_body.len() {
            let chunks = vec![event_body[..split].to_vec(), event_body[split..].to_vec()];
            let text = collect(chunks, EventStreamDecoder::default()).await.unwrap();
            assert_eq!(text, "Durability is résumé ✓", "event stream split at {}", split);
        }

        for split in 0..=line_body.len() {
            let chunks = vec![line_body[..split].to_vec(), line_body[split..].to_vec()];
            let text = collect(chunks, DataLineDecoder::default()).await.unwrap();
            assert_eq!(text, "Durability is résumé ✓", "data lines split at {}", split);
        }
    }

    #[tokio::test]
    async fn test_byte_at_a_time() {
        let body = event_stream_body(&["one ", "two ", "three"]).into_bytes();
        let chunks = body.iter().map(|byte| vec![*byte]).collect();
        let text = collect(chunks, EventStreamDecoder::default()).await.unwrap();
        assert_eq!(text, "one two three");
    }

    #[tokio::test]
    async fn test_malformed_frame_does_not_abort() {
        let body = format!(
            "data: {}\n\ndata: {{\"type\":\"content_block_delta\",\"delta\":\n\ndata: not json\n\ndata: {}\n\n",
            delta("before "),
            delta("after")
        );
        let text = collect(vec![body.into_bytes()], DataLineDecoder::default())
            .await
            .unwrap();
        assert_eq!(text, "before after");
    }

    #[tokio::test]
    async fn test_crlf_line_endings() {
        let body = format!(
            "event: content_block_delta\r\ndata: {}\r\n\r\nevent: message_stop\r\ndata: {{\"type\":\"message_stop\"}}\r\n\r\n",
            delta("crlf")
        );
        let text = collect(vec![body.into_bytes()], EventStreamDecoder::default())
            .await
            .unwrap();
        assert_eq!(text, "crlf");
    }

    #[tokio::test]
    async fn test_unterminated_final_frame_is_flushed() {
        let body = format!("data: {}", delta("tail"));
        let text = collect(vec![body.clone().into_bytes()], DataLineDecoder::default())
            .await
            .unwrap();
        assert_eq!(text, "tail");

        let text = collect(vec![body.into_bytes()], EventStreamDecoder::default())
            .await
            .unwrap();
        assert_eq!(text, "tail");
    }

    #[tokio::test]
    async fn test_error_event_ends_stream_with_error() {
        let body = format!(
            "data: {}\n\ndata: {}\n\ndata: {}\n\n",
            delta("partial"),
            json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
            delta("never")
        );
        let bytes = stream::iter(vec![Ok::<_, ProviderError>(Bytes::from(body))]);
        let mut deltas = decode_text_deltas(bytes, DataLineDecoder::default());

        assert_eq!(deltas.next().await.unwrap().unwrap(), "partial");
        match deltas.next().await {
            Some(Err(ProviderError::Stream { kind, message })) => {
                assert_eq!(kind, "overloaded_error");
                assert_eq!(message, "Overloaded");
            }
            other => panic!("expected stream error, got {:?}", other),
        }
        assert!(deltas.next().await.is_none());
    }

    #[tokio::test]
    async fn test_read_error_is_propagated() {
        let bytes = stream::iter(vec![
            Ok(Bytes::from(format!("data: {}\n", delta("ok")))),
            Err(ProviderError::Stream {
                kind: "connection_reset".to_string(),
                message: "connection reset".to_string(),
            }),
        ]);
        let mut deltas = decode_text_deltas(bytes, DataLineDecoder::default());
        assert_eq!(deltas.next().await.unwrap().unwrap(), "ok");
        assert!(matches!(
            deltas.next().await,
            Some(Err(ProviderError::Stream { .. }))
        ));
    }

    #[test]
    fn test_event_stream_joins_multiline_data() {
        let mut decoder = EventStreamDecoder::default();
        let frames = decoder.push(b"event: note\ndata: first\ndata: second\n: comment\n\n");
        assert_eq!(
            frames,
            vec![Frame {
                event: Some("note".to_string()),
                data: "first\nsecond".to_string(),
            }]
        );
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_data_line_decoder_ignores_other_lines() {
        let mut decoder = DataLineDecoder::default();
        let frames = decoder.push(b"event: ping\n: keepalive\n\ndata:{\"type\":\"ping\"}\ndata: \n");
        assert_eq!(
            frames,
            vec![Frame {
                event: None,
                data: "{\"type\":\"ping\"}".to_string(),
            }]
        );
    }
}
