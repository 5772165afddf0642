use super::lines::LineReader;
use super::parser::EnvelopeParser;
use super::store::ConversationStore;
use super::types::ParsedMessage;

/// Line reader, envelope parser and store glued together for one output stream
#[derive(Debug)]
pub struct OutputFeed {
    reader: LineReader,
    parser: EnvelopeParser,
}

impl OutputFeed {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self {
            reader: LineReader::new(),
            parser: EnvelopeParser::new(self_id),
        }
    }

    /// Feed a raw chunk; returns the messages it completed, already stored
    pub fn feed(&mut self, chunk: &[u8], store: &mut ConversationStore) -> Vec<ParsedMessage> {
        let mut added = Vec::new();
        for line in self.reader.push_bytes(chunk) {
            if let Some(msg) = self.parser.parse_line(&line) {
                store.append(&msg.contact, msg.clone());
                added.push(msg);
            }
        }
        added
    }

    /// End of input: treat a leftover unterminated line as complete
    pub fn finish(&mut self, store: &mut ConversationStore) -> Option<ParsedMessage> {
        let tail = self.reader.take_pending()?;
        self.feed_line(&tail, store)
    }

    /// Feed one already complete line
    pub fn feed_line(&mut self, line: &str, store: &mut ConversationStore) -> Option<ParsedMessage> {
        let msg = self.parser.parse_line(line)?;
        store.append(&msg.contact, msg.clone());
        Some(msg)
    }
}
