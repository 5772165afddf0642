use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState},
    Frame,
};

use super::Pane;
use crate::chat::ConversationStore;
use crate::config::ThemeConfig;

pub const ALL_CONVERSATIONS: &str = "All conversations";

pub fn render_sidebar(
    f: &mut Frame,
    area: Rect,
    contacts: &[String],
    store: &ConversationStore,
    state: &mut ListState,
    focused: bool,
    theme: &ThemeConfig,
) {
    // Available width: area minus borders (2) minus highlight symbol (2)
    let avail_width = area.width.saturating_sub(4) as usize;

    let mut items = vec![ListItem::new(Line::from(Span::styled(
        ALL_CONVERSATIONS,
        Style::default().fg(theme.primary()),
    )))];

    items.extend(contacts.iter().map(|contact| {
        let mut lines = vec![Line::from(Span::styled(
            truncate(contact, avail_width),
            Style::default().fg(theme.fg()),
        ))];
        // Second row: last message, or nothing for address-book-only contacts
        if let Some(latest) = store.latest_for(contact) {
            let preview = format!("{}: {}", latest.author_label(), latest.body);
            lines.push(Line::from(Span::styled(
                truncate(&preview, avail_width),
                Style::default().fg(theme.fg_muted()),
            )));
        }
        ListItem::new(lines)
    }));

    let title = format!("Contacts ({})", contacts.len());
    let list = List::new(items)
        .block(Pane::new(title, focused, theme).block())
        .highlight_style(
            Style::default()
                .bg(theme.selected_bg())
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, state);
}

fn truncate(s: &str, max: usize) -> String {
    if max < 4 {
        return s.chars().take(max).collect();
    }
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("+447700900000", 20), "+447700900000");
        assert_eq!(truncate("Them: a long message body", 10), "Them: a...");
        assert_eq!(truncate("héllo", 3), "hél");
    }
}
