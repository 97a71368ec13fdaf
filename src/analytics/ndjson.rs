//! Line splitting for streamed NDJSON response bodies.
//!
//! The body is read chunk by chunk and only the current partial line is
//! buffered, so memory stays bounded by the longest line regardless of the
//! export size.

/// Accumulates body chunks and yields complete lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
    // Bytes of `buf` already known to contain no newline.
    scanned: usize,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line without its `\n` (or `\r\n`) terminator.
    pub(crate) fn next_line(&mut self) -> Option<Vec<u8>> {
        let offset = self.buf[self.scanned..].iter().position(|b| *b == b'\n');
        match offset {
            Some(offset) => {
                let end = self.scanned + offset;
                let mut line: Vec<u8> = self.buf.drain(..=end).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                self.scanned = 0;
                Some(line)
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Remaining unterminated line once the body has ended.
    pub(crate) fn finish(&mut self) -> Option<Vec<u8>> {
        self.scanned = 0;
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

/// Reads an HTTP response body line by line.
///
/// Owns the response; dropping the reader releases the connection.
pub(crate) struct NdjsonLines {
    response: reqwest::Response,
    buffer: LineBuffer,
    eof: bool,
}

impl NdjsonLines {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: LineBuffer::default(),
            eof: false,
        }
    }

    /// Next line of the body, `None` at the end.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the connection fails mid-body.
    pub(crate) async fn next_line(&mut self) -> Result<Option<Vec<u8>>, reqwest::Error> {
        loop {
            if let Some(line) = self.buffer.next_line() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(self.buffer.finish());
            }
            match self.response.chunk().await? {
                Some(chunk) => self.buffer.push(&chunk),
                None => self.eof = true,
            }
        }
    }
}
