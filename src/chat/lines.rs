/// Reassembles complete lines from output that arrives in arbitrary chunks.
///
/// Bytes are buffered until a `\n` arrives; the terminator is stripped and
/// the line is yielded. Text after the last terminator stays in the buffer.
/// Lines that are not valid UTF-8 are dropped instead of failing the stream.
#[derive(Debug, Default)]
pub struct LineReader {
    buffer: Vec<u8>,
}

impl LineReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk and iterate over the lines it completes
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.buffer.extend_from_slice(chunk);
        Lines { reader: self }
    }

    pub fn push_str(&mut self, chunk: &str) -> Lines<'_> {
        self.push_bytes(chunk.as_bytes())
    }

    /// Partial line still waiting for its terminator
    pub fn pending(&self) -> String {
        String::from_utf8_lossy(&self.buffer).into_owned()
    }

    /// Empty the buffer at end of input, returning the unterminated tail
    pub fn take_pending(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.buffer);
        String::from_utf8(tail).ok()
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let newline = self.buffer.iter().position(|&b| b == b'\n')?;
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();

            match String::from_utf8(line) {
                Ok(line) => return Some(line),
                Err(e) => {
                    log::debug!(
                        "Dropping undecodable output line ({} bytes): {}",
                        e.as_bytes().len(),
                        e.utf8_error()
                    );
                }
            }
        }
    }
}

/// Lazy iterator over the lines completed so far.
///
/// Lines not consumed before the iterator is dropped stay buffered and are
/// yielded by the next push.
pub struct Lines<'a> {
    reader: &'a mut LineReader,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.reader.next_line()
    }
}
