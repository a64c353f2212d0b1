//! Task log streaming.
//!
//! The log endpoint keeps the connection open and pushes base64 text,
//! either as raw chunks or as a sequence of JSON frames with a base64 `Data`
//! field. Network chunk boundaries do not line up with base64 quads, JSON
//! frames or UTF-8 characters, so [`LogDecoder`] carries partial input over
//! between chunks.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::client::{api_error, SchedulerClient};
use crate::error::ClientError;

/// Which output stream of the task to follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogType {
    #[default]
    Stdout,
    Stderr,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Stdout => "stdout",
            LogType::Stderr => "stderr",
        }
    }
}

/// Wire framing of the log stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFraming {
    /// Raw chunks of base64 text (`plain=true`).
    #[default]
    Plain,
    /// Concatenated JSON frames whose `Data` field is base64.
    Json,
}

#[derive(Debug, Deserialize)]
struct LogFrame {
    #[serde(rename = "Data", default)]
    data: String,
}

/// Incremental decoder turning raw stream chunks into text.
#[derive(Debug)]
pub struct LogDecoder {
    framing: LogFraming,
    /// Input not yet decoded: a partial base64 quad or a partial JSON frame.
    pending: Vec<u8>,
    /// Decoded bytes ending in an incomplete UTF-8 sequence.
    utf8_tail: Vec<u8>,
}

impl LogDecoder {
    pub fn new(framing: LogFraming) -> Self {
        Self {
            framing,
            pending: Vec::new(),
            utf8_tail: Vec::new(),
        }
    }

    /// Feed one network chunk; returns the text it completed, if any.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<String>, ClientError> {
        let decoded = match self.framing {
            LogFraming::Plain => self.push_plain(chunk)?,
            LogFraming::Json => self.push_frames(chunk)?,
        };
        Ok(self.take_text(decoded))
    }

    /// Flush at end of stream. Incomplete trailing input is an error.
    pub fn finish(mut self) -> Result<Option<String>, ClientError> {
        match self.framing {
            LogFraming::Plain if !self.pending.is_empty() => {
                // Let the engine report the precise problem with the leftover bytes.
                STANDARD.decode(&self.pending)?;
            }
            LogFraming::Json if self.pending.iter().any(|b| !b.is_ascii_whitespace()) => {
                serde_json::from_slice::<LogFrame>(&self.pending)?;
            }
            _ => {}
        }

        if self.utf8_tail.is_empty() {
            return Ok(None);
        }
        let tail = std::mem::take(&mut self.utf8_tail);
        Ok(Some(String::from_utf8_lossy(&tail).into_owned()))
    }

    fn push_plain(&mut self, chunk: &[u8]) -> Result<Vec<u8>, ClientError> {
        self.pending
            .extend(chunk.iter().copied().filter(|b| !b.is_ascii_whitespace()));

        let complete = self.pending.len() / 4 * 4;
        let mut out = Vec::new();
        let mut start = 0;
        // A padded quad ends one base64 message; the next quad may begin another.
        for end in (4..=complete).step_by(4) {
            if end == complete || self.pending[end - 4..end].contains(&b'=') {
                out.extend(STANDARD.decode(&self.pending[start..end])?);
                start = end;
            }
        }
        self.pending.drain(..complete);
        Ok(out)
    }

    fn push_frames(&mut self, chunk: &[u8]) -> Result<Vec<u8>, ClientError> {
        self.pending.extend_from_slice(chunk);

        let mut out = Vec::new();
        let mut consumed = 0;
        let mut frames = serde_json::Deserializer::from_slice(&self.pending).into_iter::<LogFrame>();
        loop {
            match frames.next() {
                Some(Ok(frame)) => {
                    consumed = frames.byte_offset();
                    // Heartbeat frames carry no data.
                    if !frame.data.is_empty() {
                        out.extend(STANDARD.decode(frame.data.as_bytes())?);
                    }
                }
                Some(Err(e)) if e.is_eof() => break,
                Some(Err(e)) => return Err(e.into()),
                None => {
                    consumed = self.pending.len();
                    break;
                }
            }
        }
        self.pending.drain(..consumed);
        Ok(out)
    }

    fn take_text(&mut self, decoded: Vec<u8>) -> Option<String> {
        self.utf8_tail.extend(decoded);
        let ready_len = match std::str::from_utf8(&self.utf8_tail) {
            Ok(_) => self.utf8_tail.len(),
            // Incomplete character at the end: hold it for the next chunk.
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.utf8_tail.len(),
        };
        if ready_len == 0 {
            return None;
        }
        let rest = self.utf8_tail.split_off(ready_len);
        let ready = std::mem::replace(&mut self.utf8_tail, rest);
        Some(String::from_utf8_lossy(&ready).into_owned())
    }
}

impl SchedulerClient {
    /// Follow the logs of `task` in allocation `alloc_id`, handing each decoded
    /// text chunk to `sink` until the scheduler closes the stream.
    ///
    /// Drop the returned future to stop following.
    pub async fn stream_logs<F>(
        &self,
        alloc_id: &str,
        task: &str,
        log_type: LogType,
        framing: LogFraming,
        mut sink: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(String),
    {
        let url = self.endpoint(&["v1", "client", "fs", "logs", alloc_id]);
        let plain = if framing == LogFraming::Plain { "true" } else { "false" };
        debug!(url = %url, task, log_type = log_type.as_str(), "Streaming logs");

        let mut response = self
            .http()
            .get(url)
            .query(&[
                ("task", task),
                ("follow", "true"),
                ("type", log_type.as_str()),
                ("plain", plain),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let mut decoder = LogDecoder::new(framing);
        while let Some(chunk) = response.chunk().await? {
            if let Some(text) = decoder.push(&chunk)? {
                sink(text);
            }
        }
        if let Some(text) = decoder.finish()? {
            sink(text);
        }

        debug!(alloc_id, task, "Log stream closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(text: &str) -> String {
        STANDARD.encode(text)
    }

    #[test]
    fn plain_chunks_split_mid_quad() {
        let encoded = b64("hello world\n");
        let (a, b) = encoded.split_at(5);

        let mut decoder = LogDecoder::new(LogFraming::Plain);
        let first = decoder.push(a.as_bytes()).unwrap().unwrap_or_default();
        let second = decoder.push(b.as_bytes()).unwrap().unwrap_or_default();
        assert_eq!(format!("{first}{second}"), "hello world\n");
        assert!(decoder.finish().unwrap().is_none());
    }

    #[test]
    fn plain_chunks_each_padded() {
        let mut decoder = LogDecoder::new(LogFraming::Plain);
        let joined = format!("{}{}", b64("a"), b64("bc"));
        assert_eq!(decoder.push(joined.as_bytes()).unwrap().unwrap(), "abc");
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut decoder = LogDecoder::new(LogFraming::Plain);
        let bytes = "héllo".as_bytes();
        // Split inside the two-byte 'é'.
        let first = STANDARD.encode(&bytes[..2]);
        let second = STANDARD.encode(&bytes[2..]);

        assert_eq!(decoder.push(first.as_bytes()).unwrap().unwrap(), "h");
        assert_eq!(decoder.push(second.as_bytes()).unwrap().unwrap(), "éllo");
    }

    #[test]
    fn json_frames_split_across_chunks() {
        let stream = format!(
            r#"{{"File":"alloc/logs/web.stdout.0","Offset":0,"Data":"{}"}}{{}}{{"Data":"{}"}}"#,
            b64("line one\n"),
            b64("line two\n")
        );
        let (a, b) = stream.split_at(30);

        let mut decoder = LogDecoder::new(LogFraming::Json);
        assert!(decoder.push(a.as_bytes()).unwrap().is_none());
        assert_eq!(
            decoder.push(b.as_bytes()).unwrap().unwrap(),
            "line one\nline two\n"
        );
        assert!(decoder.finish().unwrap().is_none());
    }

    #[test]
    fn invalid_base64_is_an_error() {
        let mut decoder = LogDecoder::new(LogFraming::Plain);
        assert!(matches!(
            decoder.push(b"!!!!"),
            Err(ClientError::LogPayload(_))
        ));
    }

    #[test]
    fn truncated_input_fails_on_finish() {
        let mut decoder = LogDecoder::new(LogFraming::Plain);
        assert!(decoder.push(b"aGk").unwrap().is_none());
        assert!(decoder.finish().is_err());
    }
}
