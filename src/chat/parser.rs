use chrono::{DateTime, Utc};

use super::types::ParsedMessage;

const ENVELOPE_PREFIX: &str = "Envelope from:";
const SYNC_SENT_MARKER: &str = "Received sync sent message";
const TO_PREFIX: &str = "To:";
const BODY_PREFIX: &str = "Body:";

/// Context collected from the lines of the current envelope block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserState {
    pub current_sender: Option<String>,
    pub current_recipient: Option<String>,
    pub in_sync_sent_block: bool,
}

impl ParserState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LineKind<'a> {
    EnvelopeFrom,
    SyncSent,
    To,
    Body(&'a str),
    Blank,
    Other,
}

fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.starts_with(ENVELOPE_PREFIX) {
        LineKind::EnvelopeFrom
    } else if trimmed.contains(SYNC_SENT_MARKER) {
        LineKind::SyncSent
    } else if trimmed.starts_with(TO_PREFIX) {
        LineKind::To
    } else if trimmed.starts_with(BODY_PREFIX) {
        // Everything after the first "Body:" of the raw line
        let body = line
            .find(BODY_PREFIX)
            .map(|pos| &line[pos + BODY_PREFIX.len()..])
            .unwrap_or_default();
        LineKind::Body(body.trim())
    } else if trimmed.is_empty() {
        LineKind::Blank
    } else {
        LineKind::Other
    }
}

/// Phone-number-shaped tokens ("+4475...") in order of appearance
fn number_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split_whitespace().filter(|t| t.starts_with('+'))
}

/// Rebuilds messages from the human-readable output of `signal-cli receive`.
///
/// Envelopes are runs of lines separated by blank lines. Sender and recipient
/// are picked up from `Envelope from:` and `To:` lines, and every `Body:` line
/// emits one message attributed with that context. Unknown lines are ignored,
/// so a garbled envelope at worst ends up under a fallback contact.
///
/// Not thread-safe: feed it from a single consumer of the output stream.
#[derive(Debug, Clone)]
pub struct EnvelopeParser {
    self_id: String,
    state: ParserState,
}

impl EnvelopeParser {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self {
            self_id: self_id.into(),
            state: ParserState::default(),
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    pub fn parse_line(&mut self, line: &str) -> Option<ParsedMessage> {
        self.parse_line_at(line, Utc::now())
    }

    /// Like [`parse_line`](Self::parse_line) with an explicit processing time
    pub fn parse_line_at(&mut self, line: &str, now: DateTime<Utc>) -> Option<ParsedMessage> {
        match classify(line) {
            LineKind::EnvelopeFrom => {
                let mut numbers = number_tokens(line);
                if let Some(sender) = numbers.next() {
                    self.state.current_sender = Some(sender.to_string());
                }
                if let Some(recipient) = numbers.next() {
                    self.state.current_recipient = Some(recipient.to_string());
                }
                None
            }
            LineKind::SyncSent => {
                self.state.in_sync_sent_block = true;
                None
            }
            LineKind::To => {
                if let Some(last) = line.split_whitespace().last() {
                    if last.starts_with('+') {
                        self.state.current_recipient = Some(last.to_string());
                    }
                }
                None
            }
            LineKind::Body(body) => {
                let (contact, from_self) = self.resolve();
                log::debug!(
                    "Parsed message for {}: {} {}",
                    contact,
                    if from_self { "[self]" } else { "[them]" },
                    body
                );
                Some(ParsedMessage::at(contact, from_self, body, now))
            }
            LineKind::Blank => {
                self.state.reset();
                None
            }
            LineKind::Other => {
                log::trace!("Ignoring line: {}", line);
                None
            }
        }
    }

    /// Parse a complete one-shot output, including a final unterminated line
    pub fn parse_output(&mut self, text: &str) -> Vec<ParsedMessage> {
        let now = Utc::now();
        text.lines()
            .filter_map(|line| self.parse_line_at(line, now))
            .collect()
    }

    /// Contact and authorship for a body seen with the current context
    fn resolve(&self) -> (String, bool) {
        let me = self.self_id.as_str();
        let sender = self.state.current_sender.as_deref();
        let recipient = self.state.current_recipient.as_deref();

        if self.state.in_sync_sent_block {
            let contact = recipient
                .filter(|r| *r != me)
                .or(sender)
                .unwrap_or(me);
            (contact.to_string(), true)
        } else {
            let contact = sender
                .filter(|s| *s != me)
                .or(recipient)
                .unwrap_or(me);
            (contact.to_string(), sender == Some(me))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ME: &str = "+2222";

    fn parse(lines: &[&str]) -> Vec<ParsedMessage> {
        let mut parser = EnvelopeParser::new(ME);
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        lines
            .iter()
            .filter_map(|l| parser.parse_line_at(l, now))
            .collect()
    }

    fn summary(messages: &[ParsedMessage]) -> Vec<(&str, bool, &str)> {
        messages
            .iter()
            .map(|m| (m.contact.as_str(), m.from_self, m.body.as_str()))
            .collect()
    }

    #[test]
    fn test_incoming_message() {
        let msgs = parse(&[
            "Envelope from: \"A\" +1111 (device: 1) to +2222",
            "Body: hello",
            "",
        ]);
        assert_eq!(summary(&msgs), vec![("+1111", false, "hello")]);
    }

    #[test]
    fn test_sync_sent_message() {
        let msgs = parse(&[
            "Received sync sent message",
            "To: \"B\" +3333",
            "Body: hi there",
            "",
        ]);
        assert_eq!(summary(&msgs), vec![("+3333", true, "hi there")]);
    }

    #[test]
    fn test_sync_block_inside_envelope() {
        let msgs = parse(&[
            "Envelope from: \"Me\" +2222 (device: 2) to +2222",
            "Timestamp: 1700000000000 (2023-11-14T22:13:20Z)",
            "Received sync sent message",
            "  To: \"B\" +3333",
            "  Body: from my phone",
            "",
        ]);
        assert_eq!(summary(&msgs), vec![("+3333", true, "from my phone")]);
    }

    #[test]
    fn test_multiple_bodies_share_context() {
        let msgs = parse(&[
            "Envelope from: \"A\" +1111 (device: 1) to +2222",
            "Body: one",
            "Body: two",
            "",
        ]);
        assert_eq!(
            summary(&msgs),
            vec![("+1111", false, "one"), ("+1111", false, "two")]
        );
    }

    #[test]
    fn test_blank_line_resets_state() {
        let mut parser = EnvelopeParser::new(ME);
        parser.parse_line("Envelope from: \"A\" +1111 (device: 1) to +2222");
        parser.parse_line("Received sync sent message");
        assert!(parser.state().in_sync_sent_block);
        parser.parse_line("   ");
        assert_eq!(parser.state(), &ParserState::default());

        let msg = parser.parse_line("Body: orphan").unwrap();
        assert_eq!((msg.contact.as_str(), msg.from_self), (ME, false));
    }

    #[test]
    fn test_envelope_without_numbers_keeps_context() {
        let mut parser = EnvelopeParser::new(ME);
        parser.parse_line("Envelope from: \"A\" +1111 (device: 1) to +2222");
        parser.parse_line("Envelope from: \"Unknown\" (device: 3)");
        assert_eq!(parser.state().current_sender.as_deref(), Some("+1111"));
        assert_eq!(parser.state().current_recipient.as_deref(), Some("+2222"));
    }

    #[test]
    fn test_own_message_falls_back_to_recipient() {
        let msgs = parse(&["Envelope from: \"Me\" +2222 (device: 2) to +4444", "Body: note"]);
        assert_eq!(summary(&msgs), vec![("+4444", true, "note")]);
    }

    #[test]
    fn test_sync_without_recipient_falls_back_to_sender_then_self() {
        let msgs = parse(&[
            "Envelope from: \"A\" +1111 (device: 1)",
            "Received sync sent message",
            "Body: via sender",
            "",
            "Received sync sent message",
            "Body: to self",
        ]);
        assert_eq!(
            summary(&msgs),
            vec![("+1111", true, "via sender"), (ME, true, "to self")]
        );
    }

    #[test]
    fn test_to_line_requires_number() {
        let mut parser = EnvelopeParser::new(ME);
        parser.parse_line("To: \"Group\" Friends");
        assert_eq!(parser.state().current_recipient, None);
        parser.parse_line("To: +5555");
        assert_eq!(parser.state().current_recipient.as_deref(), Some("+5555"));
    }

    #[test]
    fn test_body_after_first_marker() {
        let msgs = parse(&["Body:   says Body: twice  "]);
        assert_eq!(msgs[0].body, "says Body: twice");
    }

    #[test]
    fn test_unrecognised_lines_ignored() {
        let msgs = parse(&[
            "Envelope from: \"A\" +1111 (device: 1) to +2222",
            "Message timestamp: 1700000000000",
            "Profile key update, key length:32",
            "With profile key",
            "Body: still here",
        ]);
        assert_eq!(summary(&msgs), vec![("+1111", false, "still here")]);
    }

    #[test]
    fn test_parse_output_handles_unterminated_tail() {
        let mut parser = EnvelopeParser::new(ME);
        let text = "Envelope from: \"A\" +1111 (device: 1) to +2222\nBody: last";
        let msgs = parser.parse_output(text);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].body, "last");
    }
}
