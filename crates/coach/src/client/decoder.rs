use std::char::REPLACEMENT_CHARACTER;

/// Incremental UTF-8 decoder for a chunked body.
///
/// A code point split across two chunks is held back until its remaining bytes
/// arrive. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `chunk` (plus any carried bytes) as is complete.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut text = String::new();
        let mut start = 0;
        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    text.push_str(valid);
                    start = self.pending.len();
                }
                Err(err) => {
                    let end = start + err.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[start..end]));
                    match err.error_len() {
                        Some(invalid) => {
                            text.push(REPLACEMENT_CHARACTER);
                            start = end + invalid;
                        }
                        None => {
                            // incomplete sequence at the end, wait for more bytes
                            start = end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        text
    }

    /// Flush bytes still held back once the body has ended.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }
}
