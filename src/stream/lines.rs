//! Newline splitter for chunked response bodies.
//!
//! Bytes arrive in arbitrary network chunks; a line (and a UTF-8 code point)
//! may straddle any chunk boundary. [`LineDecoder`] buffers the tail and only
//! yields lines that were terminated by `\n`. A final fragment without a
//! newline is never yielded.

use memchr::memchr;

const COMPACT_THRESHOLD: usize = 8 * 1024;

/// Incremental line splitter that owns the pending text buffer.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: String,
    read_offset: usize,
    utf8_tail: Vec<u8>,
}

impl LineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk and append it to the pending buffer.
    ///
    /// Incomplete multi-byte sequences at the end of the chunk are held back
    /// until the next chunk completes them. Invalid sequences decode to U+FFFD.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        if self.utf8_tail.is_empty() {
            let consumed = decode_utf8_into(chunk, &mut self.buffer);
            if consumed < chunk.len() {
                self.utf8_tail.extend_from_slice(&chunk[consumed..]);
            }
            return;
        }

        self.utf8_tail.extend_from_slice(chunk);
        let consumed = decode_utf8_into(&self.utf8_tail, &mut self.buffer);
        self.utf8_tail.drain(..consumed);
    }

    /// Pop the next complete line, without its `\n` and one trailing `\r`.
    pub fn next_line(&mut self) -> Option<String> {
        let rel_pos = memchr(b'\n', &self.buffer.as_bytes()[self.read_offset..])?;
        let line_end = self.read_offset + rel_pos;
        let mut line = &self.buffer[self.read_offset..line_end];
        if let Some(stripped) = line.strip_suffix('\r') {
            line = stripped;
        }
        let line = line.to_owned();
        self.read_offset = line_end + 1;
        self.compact();
        Some(line)
    }

    /// Bytes buffered but not yet returned as lines.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len() - self.read_offset + self.utf8_tail.len()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.read_offset = 0;
        self.utf8_tail.clear();
    }

    /// End of input: discard the unterminated tail and report its size.
    pub fn finish(&mut self) -> usize {
        let dropped = self.pending_len();
        self.clear();
        dropped
    }

    fn compact(&mut self) {
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
            return;
        }
        let should_compact = self.read_offset > 0
            && (self.read_offset >= self.buffer.len() / 2
                || self.read_offset >= COMPACT_THRESHOLD);
        if should_compact {
            self.buffer.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }
}

/// Append the decodable prefix of `bytes` to `out`, returning how many bytes
/// were consumed. Only an incomplete sequence at the very end is left over.
fn decode_utf8_into(bytes: &[u8], out: &mut String) -> usize {
    let mut consumed = 0;
    loop {
        match std::str::from_utf8(&bytes[consumed..]) {
            Ok(text) => {
                out.push_str(text);
                return bytes.len();
            }
            Err(err) => {
                let valid_up_to = consumed + err.valid_up_to();
                if let Ok(valid) = std::str::from_utf8(&bytes[consumed..valid_up_to]) {
                    out.push_str(valid);
                }
                match err.error_len() {
                    Some(invalid_len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        consumed = valid_up_to + invalid_len;
                    }
                    None => return valid_up_to,
                }
            }
        }
    }
}
