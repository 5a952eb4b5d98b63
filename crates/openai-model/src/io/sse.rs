use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidUtf8,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Only `data` fields are meaningful for the chat-completion stream.
/// Comment lines and fields of other names are skipped, and consecutive
/// `data` lines of one event are joined with a line feed, per the SSE
/// wire format. Both `lf` and `cr lf` line endings are accepted.
pub struct Sse {
    buf: Vec<u8>,
    pending_data: Vec<String>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            pending_data: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Dispatch an event from the buffered lines first.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            // Not enough buffered data for an event, read more.
            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::ChunksError)?
            else {
                // The stream is over; an unterminated trailing event is
                // discarded per the SSE format.
                return Ok(None);
            };
            self.buf.extend_from_slice(&bytes);
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // A line never splits a code point, so converting line by line is
        // safe even when a chunk boundary falls inside a character.
        while let Some(eol_idx) = self.buf.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(0..=eol_idx).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let Ok(line) = String::from_utf8(line) else {
                return Err(Error::InvalidUtf8);
            };

            if line.is_empty() {
                // A blank line dispatches the accumulated event, if any.
                if !self.pending_data.is_empty() {
                    let event = self.pending_data.join("\n");
                    self.pending_data.clear();
                    return Ok(Some(event));
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => {
                    (field, value.strip_prefix(' ').unwrap_or(value))
                }
                None => (line.as_str(), ""),
            };
            if field == "data" {
                self.pending_data.push(value.to_owned());
            }
        }
        Ok(None)
    }
}
