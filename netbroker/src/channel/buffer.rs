//! Output buffer with tail-only prompt search.
//!
//! Prompts always sit at the end of what the device has sent so far, so
//! only the last `search_depth` bytes are scanned. Large outputs (full
//! configurations, routing tables) stay cheap to poll.

use regex::bytes::Regex;

/// Accumulates ANSI-stripped session output and looks for a prompt in its tail.
#[derive(Debug)]
pub struct PatternBuffer {
    buffer: Vec<u8>,
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a buffer searching the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Append data, stripping ANSI escape sequences.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Offset of the tail region within the buffer.
    fn tail_start(&self) -> usize {
        self.buffer.len().saturating_sub(self.search_depth)
    }

    /// Find `pattern` in the tail; offsets are relative to the full buffer.
    pub fn search_tail(&self, pattern: &Regex) -> Option<(usize, usize)> {
        let start = self.tail_start();
        pattern
            .find(&self.buffer[start..])
            .map(|m| (start + m.start(), start + m.end()))
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        self.search_tail(pattern).is_some()
    }

    /// Remove and return everything up to the end of the tail match.
    ///
    /// Bytes after the match stay buffered for the next read.
    pub fn take_through_match(&mut self, pattern: &Regex) -> Option<Vec<u8>> {
        let (_, end) = self.search_tail(pattern)?;
        let rest = self.buffer.split_off(end);
        Some(std::mem::replace(&mut self.buffer, rest))
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mrouter#\x1b[0m");
        assert_eq!(buffer.as_slice(), b"router#");
    }

    #[test]
    fn test_prompt_outside_tail_is_ignored() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"router#");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"router#").unwrap();
        assert!(!buffer.tail_contains(&pattern));
    }

    #[test]
    fn test_match_offsets_are_absolute() {
        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nrouter#");

        let pattern = Regex::new(r"router#").unwrap();
        assert_eq!(buffer.search_tail(&pattern), Some((101, 108)));
    }

    #[test]
    fn test_take_through_match_keeps_remainder() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"show clock\n12:00\nrouter#\nleftover");

        let pattern = Regex::new(r"(?m)^router#").unwrap();
        let taken = buffer.take_through_match(&pattern).unwrap();
        assert_eq!(taken, b"show clock\n12:00\nrouter#");
        assert_eq!(buffer.as_slice(), b"\nleftover");

        assert!(buffer.take_through_match(&pattern).is_none());
        assert_eq!(buffer.take(), b"\nleftover");
        assert!(buffer.is_empty());
    }
}
