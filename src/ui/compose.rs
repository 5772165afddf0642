use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::Pane;
use crate::app::{ComposeField, ComposeState};
use crate::config::ThemeConfig;

pub fn render_compose(f: &mut Frame, area: Rect, compose: &ComposeState, theme: &ThemeConfig) {
    let label_style = Style::default().fg(theme.warning());
    let cursor_style = Style::default().fg(theme.primary());

    let field = |label: &'static str, value: &str, active: bool| {
        let mut spans = vec![
            Span::styled(label, label_style),
            Span::styled(value.to_string(), Style::default().fg(theme.fg())),
        ];
        if active {
            spans.push(Span::styled("_", cursor_style));
        }
        Line::from(spans)
    };

    let lines = vec![
        field(
            "To: ",
            &compose.recipient,
            compose.field == ComposeField::Recipient,
        ),
        field(
            "Message: ",
            &compose.body,
            compose.field == ComposeField::Body,
        ),
    ];

    let paragraph = Paragraph::new(lines)
        .block(Pane::new("Compose", true, theme).block())
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

pub fn render_compose_help(f: &mut Frame, area: Rect, theme: &ThemeConfig) {
    let key_style = Style::default().fg(theme.primary());
    let text_style = Style::default().fg(theme.fg_subtle());

    let help = Line::from(vec![
        Span::styled("Tab", key_style),
        Span::styled(" field  ", text_style),
        Span::styled("Enter", key_style),
        Span::styled(" send  ", text_style),
        Span::styled("Esc", key_style),
        Span::styled(" cancel", text_style),
    ]);

    let paragraph = Paragraph::new(help).style(Style::default().bg(theme.bg_panel()));
    f.render_widget(paragraph, area);
}
