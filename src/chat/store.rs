use std::collections::HashMap;

use super::types::ParsedMessage;

/// In-memory conversations keyed by contact identifier.
///
/// Messages are kept in one append-only log; each contact indexes into it,
/// so per-contact order is arrival order and the aggregate view can break
/// timestamp ties by global insertion order.
#[derive(Debug, Default)]
pub struct ConversationStore {
    log: Vec<ParsedMessage>,
    by_contact: HashMap<String, Vec<usize>>,
    // First-seen order for the sidebar
    contacts: Vec<String>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the end of the contact's conversation, creating it if needed
    pub fn append(&mut self, contact: &str, message: ParsedMessage) {
        let idx = self.log.len();
        self.log.push(message);
        match self.by_contact.get_mut(contact) {
            Some(indices) => indices.push(idx),
            None => {
                self.by_contact.insert(contact.to_string(), vec![idx]);
                self.contacts.push(contact.to_string());
            }
        }
    }

    /// Messages for one contact in arrival order, or for everyone ordered by
    /// timestamp when no contact is given
    pub fn messages_for(&self, contact: Option<&str>) -> Vec<&ParsedMessage> {
        match contact {
            Some(contact) => self
                .by_contact
                .get(contact)
                .map(|indices| indices.iter().map(|&i| &self.log[i]).collect())
                .unwrap_or_default(),
            None => {
                let mut all: Vec<&ParsedMessage> = self.log.iter().collect();
                // sort_by_key is stable, so equal timestamps keep insertion order
                all.sort_by_key(|m| m.timestamp);
                all
            }
        }
    }

    /// Contacts with at least one message, in the order they first appeared
    pub fn contacts(&self) -> &[String] {
        &self.contacts
    }

    pub fn latest_for(&self, contact: &str) -> Option<&ParsedMessage> {
        self.by_contact
            .get(contact)
            .and_then(|indices| indices.last())
            .map(|&i| &self.log[i])
    }

    pub fn contains(&self, contact: &str) -> bool {
        self.by_contact.contains_key(contact)
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(contact: &str, body: &str, secs: i64) -> ParsedMessage {
        ParsedMessage::at(contact, false, body, at(secs))
    }

    fn bodies(messages: &[&ParsedMessage]) -> Vec<String> {
        messages.iter().map(|m| m.body.clone()).collect()
    }

    #[test]
    fn test_append_creates_conversation() {
        let mut store = ConversationStore::new();
        assert!(store.messages_for(Some("+1111")).is_empty());

        store.append("+1111", msg("+1111", "a", 0));
        store.append("+1111", msg("+1111", "b", 1));
        assert_eq!(bodies(&store.messages_for(Some("+1111"))), vec!["a", "b"]);
        assert_eq!(store.contacts(), ["+1111".to_string()]);
    }

    #[test]
    fn test_aggregate_sorted_by_timestamp() {
        let mut store = ConversationStore::new();
        store.append("+1111", msg("+1111", "t1", 1));
        store.append("+3333", msg("+3333", "t2", 3));
        store.append("+1111", msg("+1111", "t3", 2));

        assert_eq!(bodies(&store.messages_for(None)), vec!["t1", "t3", "t2"]);
        // Per-contact view keeps arrival order
        assert_eq!(bodies(&store.messages_for(Some("+1111"))), vec!["t1", "t3"]);
    }

    #[test]
    fn test_aggregate_ties_keep_insertion_order() {
        let mut store = ConversationStore::new();
        store.append("+3333", msg("+3333", "first", 5));
        store.append("+1111", msg("+1111", "second", 5));
        store.append("+2222", msg("+2222", "third", 5));

        assert_eq!(
            bodies(&store.messages_for(None)),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_locally_sent_message_visible() {
        let mut store = ConversationStore::new();
        let sent = ParsedMessage::new("+4444", true, "on my way");
        store.append("+4444", sent.clone());

        let messages = store.messages_for(Some("+4444"));
        assert_eq!(messages, vec![&sent]);
        assert_eq!(store.latest_for("+4444"), Some(&sent));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut store = ConversationStore::new();
        let m = msg("+1111", "again", 0);
        store.append("+1111", m.clone());
        store.append("+1111", m);
        assert_eq!(store.len(), 2);
        assert_eq!(store.contacts().len(), 1);
    }
}
