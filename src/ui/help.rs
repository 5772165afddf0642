use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::config::ThemeConfig;

/// What the status bar reports besides the key hints
pub struct StatusInfo<'a> {
    pub daemon_ready: bool,
    /// Process state of the daemon, e.g. "running (pid 42)"
    pub daemon_state: &'a str,
    pub receiving: bool,
    pub message: Option<&'a str>,
}

pub fn render_help(f: &mut Frame, area: Rect, status: &StatusInfo, theme: &ThemeConfig) {
    let key_style = Style::default().fg(theme.primary());
    let text_style = Style::default().fg(theme.fg_subtle());

    let mut spans = vec![
        Span::styled("h/l", key_style),
        Span::styled(" pane  ", text_style),
        Span::styled("j/k", key_style),
        Span::styled(" nav  ", text_style),
        Span::styled("r", key_style),
        Span::styled(" receive  ", text_style),
        Span::styled("c", key_style),
        Span::styled(" contacts  ", text_style),
        Span::styled("i", key_style),
        Span::styled(" compose  ", text_style),
        Span::styled("L", key_style),
        Span::styled(" link  ", text_style),
        Span::styled("q", key_style),
        Span::styled(" quit", text_style),
    ];

    let separator = || Span::styled("  │  ", Style::default().fg(theme.border()));

    spans.push(separator());
    let daemon_color = if status.daemon_ready {
        theme.success()
    } else {
        theme.warning()
    };
    spans.push(Span::styled(
        format!("daemon {}", status.daemon_state),
        Style::default().fg(daemon_color),
    ));
    if status.receiving {
        spans.push(Span::styled(
            "  receiving...",
            Style::default().fg(theme.secondary()),
        ));
    }

    if let Some(msg) = status.message {
        spans.push(separator());
        spans.push(Span::styled(msg.to_string(), Style::default().fg(theme.fg())));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.bg_panel()));
    f.render_widget(paragraph, area);
}
