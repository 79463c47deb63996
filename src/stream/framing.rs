/// Reassembles logical records from the CLI's line-oriented framing.
///
/// The CLI writes each JSON fragment on its own physical line and
/// terminates a logical record with one blank line. A record may span
/// several lines, and the final record of a bounded run is not always
/// followed by a trailing blank line, so end-of-stream flushes whatever
/// is buffered through [`RecordFramer::finish`].
///
/// The framer never assumes one read equals one record; it only sees
/// whole lines, which the reader's buffered line splitter reassembles
/// from arbitrary OS-level chunking.
#[derive(Debug, Default)]
pub struct RecordFramer {
    buffer: String,
}

impl RecordFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one physical line. Returns a complete record's text when the
    /// line is the blank separator closing a non-empty buffer.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end();
        if line.is_empty() {
            if self.buffer.is_empty() {
                // consecutive separators, or a blank leading the stream
                return None;
            }
            return Some(std::mem::take(&mut self.buffer));
        }
        self.buffer.push_str(line);
        None
    }

    /// Flush a record left unterminated at end of stream, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}
