//! Server-sent event decoding and delta collection for streaming calls

use log::{debug, trace};
use serde_json::Value;

use crate::request::{CanonicalResponse, TextChoice};

const DONE_SENTINEL: &str = "[DONE]";

/// One decoded line of an SSE stream
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent
{   /// A JSON chunk carried on a `data:` line
    Data(Value)
  , /// End-of-stream sentinel
    Done
  , /// Blank line, comment, keep-alive or a non-data field
    Skip
}

/// Decode one line of a streaming reply
pub fn parse_sse_line(line: &str)
  -> Result<SseEvent, crate::error::Error>
{   let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() || line.starts_with(':')
    {   trace!("Skipping SSE line: {:?}", line);
        return Ok(SseEvent::Skip);
    }

    let data = match line.strip_prefix("data:")
    {   Some(data) => data.trim_start()
      , None => {
          trace!("Skipping SSE field: {:?}", line);
          return Ok(SseEvent::Skip);
        }
    };

    if data == DONE_SENTINEL
    {   debug!("Stream finished");
        return Ok(SseEvent::Done);
    }

    serde_json::from_str(data)
      .map(SseEvent::Data)
      .map_err(|e| {
        crate::error::Error::ParseError(format!("stream chunk: {}", e))
      })
}

/// Concatenates the normalized delta choices of successive chunks
#[derive(Debug, Clone, Default)]
pub struct StreamCollector
{   text: String
  , chunks: usize
  , last: Option<CanonicalResponse>
  , done: bool
}

impl StreamCollector
{   pub fn new() -> Self
    {   StreamCollector::default()
    }

    /// Append one normalized chunk
    pub fn push(&mut self, chunk: &CanonicalResponse)
    {   for choice in &chunk.choices
        {   self.text.push_str(&choice.text);
        }
        self.chunks += 1;
        self.last = Some(chunk.clone());
    }

    /// Decode and normalize one raw SSE line through `client`.
    /// Returns true once the end-of-stream sentinel has been seen.
    pub fn feed_line(
      &mut self
    , client: &crate::Client
    , line: &str
    ) -> Result<bool, crate::error::Error>
    {   match parse_sse_line(line)?
        {   SseEvent::Data(raw) => {
              let chunk = client.postprocess_response(&raw);
              self.push(&chunk);
            }
          , SseEvent::Done => self.done = true
          , SseEvent::Skip => {}
        }
        Ok(self.done)
    }

    pub fn text(&self) -> &str
    {   &self.text
    }

    pub fn chunks(&self) -> usize
    {   self.chunks
    }

    pub fn is_done(&self) -> bool
    {   self.done
    }

    /// Merged response: the last chunk's passthrough fields with a
    /// single choice holding the collected text
    pub fn finish(self) -> CanonicalResponse
    {   let extra = self.last
          .map(|chunk| chunk.extra)
          .unwrap_or_default();
        CanonicalResponse
        {   choices: vec![TextChoice::new(self.text)]
          , extra
        }
    }
}
