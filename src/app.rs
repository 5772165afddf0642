use ratatui::widgets::ListState;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::chat::{ConversationStore, EnvelopeParser, ParsedMessage};
use crate::config::Config;
use crate::signal::{Contact, SignalEvent, Source, Stream};

/// Lines kept in the log pane
const LOG_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    Chat,
    Compose,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pane {
    Sidebar,
    Conversation,
    Log,
}

impl Pane {
    pub fn next(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Conversation,
            Pane::Conversation => Pane::Log,
            Pane::Log => Pane::Sidebar,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkStatus {
    /// Not asked yet or already linked from an earlier run
    Idle,
    /// `link` is running; the URI shows up once printed
    Pending(Option<String>),
    Linked,
    Failed(Option<i32>),
}

/// Sidebar selection, kept by contact id so rows can reorder underneath it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Nothing picked yet; the first contact to show up gets selected
    Unset,
    All,
    Contact(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ComposeField {
    Recipient,
    #[default]
    Body,
}

#[derive(Debug, Clone, Default)]
pub struct ComposeState {
    pub recipient: String,
    pub body: String,
    pub field: ComposeField,
}

impl ComposeState {
    fn active_mut(&mut self) -> &mut String {
        match self.field {
            ComposeField::Recipient => &mut self.recipient,
            ComposeField::Body => &mut self.body,
        }
    }
}

pub struct App {
    pub config: Arc<Config>,
    pub view: View,
    pub focused_pane: Pane,
    pub store: ConversationStore,
    /// Fresh per receive run, since each run is its own output stream
    parser: EnvelopeParser,
    /// Contacts reported by `listContacts`
    pub known_contacts: Vec<Contact>,
    pub selection: Selection,
    /// Row highlight for the sidebar, derived from `selection`
    pub list_state: ListState,
    pub conversation_scroll: u16,
    pub log: VecDeque<String>,
    pub link: LinkStatus,
    pub daemon_ready: bool,
    /// Daemon process state for the status bar
    pub daemon_state: String,
    auto_link_done: bool,
    pub receiving: bool,
    /// Store size when the current receive run started
    receive_base: usize,
    pub compose: ComposeState,
    pub status_message: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: Arc<Config>) -> Self {
        let parser = EnvelopeParser::new(config.self_id());
        Self {
            config,
            view: View::Chat,
            focused_pane: Pane::Sidebar,
            store: ConversationStore::new(),
            parser,
            known_contacts: Vec::new(),
            selection: Selection::Unset,
            list_state: ListState::default(),
            conversation_scroll: 0,
            log: VecDeque::new(),
            link: LinkStatus::Idle,
            daemon_ready: false,
            daemon_state: String::new(),
            auto_link_done: false,
            receiving: false,
            receive_base: 0,
            compose: ComposeState::default(),
            status_message: None,
            should_quit: false,
        }
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    /// Sidebar rows after "All conversations": contacts with messages in
    /// first-seen order, then the rest of the address book
    pub fn sidebar_contacts(&self) -> Vec<String> {
        let mut entries: Vec<String> = self.store.contacts().to_vec();
        for contact in &self.known_contacts {
            let id = contact.id();
            if !self.store.contains(id) && !entries.iter().any(|e| e == id) {
                entries.push(id.to_string());
            }
        }
        entries
    }

    /// The selected contact, `None` for the aggregate view
    pub fn selected_contact(&self) -> Option<String> {
        match &self.selection {
            Selection::Contact(id) => Some(id.clone()),
            Selection::Unset | Selection::All => None,
        }
    }

    /// Sidebar row of the selection; row 0 is "All conversations"
    fn selected_index(&self, entries: &[String]) -> Option<usize> {
        match &self.selection {
            Selection::Unset => None,
            Selection::All => Some(0),
            Selection::Contact(id) => entries.iter().position(|e| e == id).map(|i| i + 1),
        }
    }

    /// Point the sidebar highlight at the selected contact's current row
    pub fn sync_list_state(&mut self) {
        let entries = self.sidebar_contacts();
        let index = self.selected_index(&entries);
        self.list_state.select(index);
    }

    pub fn conversation(&self) -> Vec<&ParsedMessage> {
        self.store.messages_for(self.selected_contact().as_deref())
    }

    pub fn next(&mut self) {
        let entries = self.sidebar_contacts();
        let i = match self.selected_index(&entries) {
            Some(i) => (i + 1).min(entries.len()),
            None => 0,
        };
        self.select_row(&entries, i);
    }

    pub fn previous(&mut self) {
        let entries = self.sidebar_contacts();
        let i = match self.selected_index(&entries) {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.select_row(&entries, i);
    }

    fn select_row(&mut self, entries: &[String], index: usize) {
        let selection = match index {
            0 => Selection::All,
            i => match entries.get(i - 1) {
                Some(id) => Selection::Contact(id.clone()),
                None => Selection::All,
            },
        };
        self.select(selection);
    }

    fn select(&mut self, selection: Selection) {
        if self.selection != selection {
            self.conversation_scroll = 0;
        }
        self.selection = selection;
        self.sync_list_state();
    }

    pub fn scroll_down(&mut self) {
        self.conversation_scroll = self.conversation_scroll.saturating_add(3);
    }

    pub fn scroll_up(&mut self) {
        self.conversation_scroll = self.conversation_scroll.saturating_sub(3);
    }

    /// A receive run is starting; its output gets a parser of its own
    pub fn begin_receive(&mut self) {
        self.parser = EnvelopeParser::new(self.config.self_id());
        self.receiving = true;
        self.receive_base = self.store.len();
    }

    /// True once, the first time the daemon is ready: a fresh install pairs then
    pub fn take_auto_link(&mut self) -> bool {
        if self.daemon_ready && !self.auto_link_done {
            self.auto_link_done = true;
            return true;
        }
        false
    }

    pub fn set_contacts(&mut self, contacts: Vec<Contact>) {
        self.known_contacts = contacts;
        if self.selection == Selection::Unset {
            let first = self.known_contacts.first().map(|c| c.id().to_string());
            if let Some(id) = first {
                self.select(Selection::Contact(id));
            }
        }
        self.sync_list_state();
    }

    fn record(&mut self, message: ParsedMessage) {
        let contact = message.contact.clone();
        self.store.append(&contact, message);

        if self.selection == Selection::Unset {
            self.select(Selection::Contact(contact));
        } else {
            self.sync_list_state();
        }
    }

    fn show_receive_summary(&mut self) {
        let count = self.store.len().saturating_sub(self.receive_base);
        self.set_status(&format!("Receive done, {} new messages", count));
    }

    /// Keep a message we just sent, since receive does not echo it back
    pub fn record_sent(&mut self, recipient: &str, body: &str) {
        self.record(ParsedMessage::new(recipient, true, body));
    }

    pub fn handle_event(&mut self, event: SignalEvent) {
        match event {
            SignalEvent::DaemonReady => {
                self.daemon_ready = true;
                self.set_status("Daemon ready");
            }
            SignalEvent::Output {
                source,
                stream,
                line,
            } => {
                if source == Source::Receive && stream == Stream::Stdout {
                    if let Some(message) = self.parser.parse_line(&line) {
                        self.record(message);
                        // Reader threads may deliver lines after the exit was reaped
                        let summary_shown = self
                            .status_message
                            .as_deref()
                            .is_some_and(|s| s.starts_with("Receive done"));
                        if !self.receiving && summary_shown {
                            self.show_receive_summary();
                        }
                    }
                }
                self.push_log(format!("[{}] {}", source, line));
            }
            SignalEvent::LinkCode(uri) => {
                self.push_log(format!("[link] {}", uri));
                self.link = LinkStatus::Pending(Some(uri));
            }
            SignalEvent::Linked => {
                self.link = LinkStatus::Linked;
                self.set_status("Linked");
            }
            SignalEvent::LinkFailed { code } => {
                self.link = LinkStatus::Failed(code);
                self.set_status("Link failed");
            }
            SignalEvent::Exited { source, code } => {
                self.push_log(format!("[{}] exited with {:?}", source, code));
                match source {
                    Source::Receive => {
                        self.receiving = false;
                        self.show_receive_summary();
                    }
                    Source::Daemon => {
                        self.daemon_ready = false;
                        self.set_status("Daemon exited");
                    }
                    Source::Link => {}
                }
            }
        }
    }

    /// Show the modal while a link is underway or just failed
    pub fn link_modal_visible(&self) -> bool {
        matches!(self.link, LinkStatus::Pending(_) | LinkStatus::Failed(_))
    }

    pub fn dismiss_link(&mut self) {
        if matches!(self.link, LinkStatus::Failed(_)) {
            self.link = LinkStatus::Idle;
        }
    }

    pub fn start_compose(&mut self) {
        self.compose = ComposeState {
            recipient: self.selected_contact().unwrap_or_default(),
            ..ComposeState::default()
        };
        if self.compose.recipient.is_empty() {
            self.compose.field = ComposeField::Recipient;
        }
        self.view = View::Compose;
    }

    pub fn compose_input(&mut self, c: char) {
        self.compose.active_mut().push(c);
    }

    pub fn compose_backspace(&mut self) {
        self.compose.active_mut().pop();
    }

    pub fn compose_toggle_field(&mut self) {
        self.compose.field = match self.compose.field {
            ComposeField::Recipient => ComposeField::Body,
            ComposeField::Body => ComposeField::Recipient,
        };
    }

    pub fn cancel_compose(&mut self) {
        self.compose = ComposeState::default();
        self.view = View::Chat;
    }
}
