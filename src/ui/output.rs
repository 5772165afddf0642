use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::collections::VecDeque;

use super::Pane;
use crate::config::ThemeConfig;

/// Tail of process output, with signal-cli's ERROR and WARN lines tinted
pub fn render_log(
    f: &mut Frame,
    area: Rect,
    log: &VecDeque<String>,
    focused: bool,
    theme: &ThemeConfig,
) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = log
        .iter()
        .skip(log.len().saturating_sub(visible))
        .map(|line| {
            let color = if line.contains("ERROR") {
                theme.error()
            } else if line.contains("WARN") {
                theme.warning()
            } else {
                theme.fg_muted()
            };
            Line::from(Span::styled(line.clone(), Style::default().fg(color)))
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(Pane::new("Log", focused, theme).block());
    f.render_widget(paragraph, area);
}
