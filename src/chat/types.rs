use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// One message reconstructed from daemon output or composed locally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParsedMessage {
    /// Identifier of the peer this message belongs to (phone number)
    pub contact: String,
    pub from_self: bool,
    pub body: String,
    /// Processing time, not the daemon's own timestamp
    pub timestamp: DateTime<Utc>,
}

impl ParsedMessage {
    pub fn new(contact: impl Into<String>, from_self: bool, body: impl Into<String>) -> Self {
        Self::at(contact, from_self, body, Utc::now())
    }

    pub fn at(
        contact: impl Into<String>,
        from_self: bool,
        body: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            contact: contact.into(),
            from_self,
            body: body.into(),
            timestamp,
        }
    }

    pub fn author_label(&self) -> &'static str {
        if self.from_self { "You" } else { "Them" }
    }

    /// Local wall-clock time, e.g. "14:05"
    pub fn time_display(&self) -> String {
        self.timestamp.with_timezone(&Local).format("%H:%M").to_string()
    }
}
