/// Reassembles lines from Docker log frames.
///
/// Frames usually carry exactly one line, but long lines are split across
/// frames, so an unterminated tail is held until its newline arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame and return every line it completes, without the
    /// trailing `\n` (or `\r\n`).
    pub fn push(&mut self, frame: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for segment in frame.split_inclusive(|b| *b == b'\n') {
            self.pending.extend_from_slice(segment);
            if self.pending.last() == Some(&b'\n') {
                lines.push(Self::finish(&mut self.pending));
            }
        }

        lines
    }

    /// Flush an unterminated tail when the stream ends.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(Self::finish(&mut self.pending))
        }
    }

    fn finish(pending: &mut Vec<u8>) -> String {
        let mut line = std::mem::take(pending);
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8_lossy(&line).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_frame() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push(b"hello\n"), vec!["hello"]);
        assert!(buffer.take_remainder().is_none());
    }

    #[test]
    fn test_multiple_lines_in_one_frame() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push(b"a\nb\r\nc\n"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_line_split_across_frames() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"{\"msg\":").is_empty());
        assert_eq!(buffer.push(b"\"hi\"}\nnext"), vec!["{\"msg\":\"hi\"}"]);
        assert_eq!(buffer.take_remainder().as_deref(), Some("next"));
    }

    #[test]
    fn test_empty_line_is_kept() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push(b"\n"), vec![""]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"bad \xff byte\n");
        assert_eq!(lines, vec!["bad \u{fffd} byte"]);
    }
}
