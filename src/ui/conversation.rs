use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::Pane;
use crate::chat::ParsedMessage;
use crate::config::ThemeConfig;

/// Byte ranges of http(s) links within one line of text
fn find_urls(text: &str) -> Vec<(usize, usize)> {
    let mut urls = Vec::new();
    let mut search_start = 0;

    loop {
        let rest = &text[search_start..];
        // Earliest of the two schemes, so an https link is not skipped
        let Some(start) = [rest.find("http://"), rest.find("https://")]
            .into_iter()
            .flatten()
            .min()
        else {
            break;
        };
        let abs_start = search_start + start;
        let end = text[abs_start..]
            .find(|c: char| c.is_whitespace() || c == '>' || c == ')' || c == ']' || c == '"')
            .map(|i| abs_start + i)
            .unwrap_or(text.len());
        urls.push((abs_start, end));
        search_start = end;
    }

    urls
}

/// Body text as spans with links underlined
fn body_spans(body: &str, style: Style) -> Vec<Span<'static>> {
    let url_style = style.add_modifier(Modifier::UNDERLINED);
    let mut spans = Vec::new();
    let mut last_end = 0;

    for (start, end) in find_urls(body) {
        if start > last_end {
            spans.push(Span::styled(body[last_end..start].to_string(), style));
        }
        spans.push(Span::styled(body[start..end].to_string(), url_style));
        last_end = end;
    }
    if last_end < body.len() || spans.is_empty() {
        spans.push(Span::styled(body[last_end..].to_string(), style));
    }
    spans
}

fn message_line(message: &ParsedMessage, show_contact: bool, theme: &ThemeConfig) -> Line<'static> {
    let color = if message.from_self {
        theme.outgoing()
    } else {
        theme.incoming()
    };

    let mut spans = vec![Span::styled(
        format!("{} ", message.time_display()),
        Style::default().fg(theme.fg_muted()),
    )];
    if show_contact {
        spans.push(Span::styled(
            format!("[{}] ", message.contact),
            Style::default().fg(theme.secondary()),
        ));
    }
    spans.push(Span::styled(
        format!("{}: ", message.author_label()),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ));
    spans.extend(body_spans(&message.body, Style::default().fg(color)));
    Line::from(spans)
}

pub fn render_conversation(
    f: &mut Frame,
    area: Rect,
    messages: &[&ParsedMessage],
    contact: Option<&str>,
    scroll: u16,
    focused: bool,
    theme: &ThemeConfig,
) {
    let title = contact.unwrap_or(super::ALL_CONVERSATIONS);

    let lines: Vec<Line> = if messages.is_empty() {
        vec![Line::from(Span::styled(
            "No messages yet. Press r to receive.",
            Style::default().fg(theme.fg_subtle()),
        ))]
    } else {
        messages
            .iter()
            .map(|m| message_line(m, contact.is_none(), theme))
            .collect()
    };

    let paragraph = Paragraph::new(lines)
        .block(Pane::new(title, focused, theme).block())
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_urls() {
        let text = "see https://signal.org/download) and http://x.y";
        let urls = find_urls(text);
        assert_eq!(urls.len(), 2);
        assert_eq!(&text[urls[0].0..urls[0].1], "https://signal.org/download");
        assert_eq!(&text[urls[1].0..urls[1].1], "http://x.y");
        assert!(find_urls("no links here").is_empty());
    }

    #[test]
    fn test_find_urls_keeps_text_order() {
        let text = "https://a.example first, then http://b.example and https://c.example";
        let found: Vec<&str> = find_urls(text).iter().map(|&(s, e)| &text[s..e]).collect();
        assert_eq!(
            found,
            vec!["https://a.example", "http://b.example", "https://c.example"]
        );
    }

    #[test]
    fn test_body_spans_cover_whole_body() {
        let body = "link: https://a.b done";
        let spans = body_spans(body, Style::default());
        let joined: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(joined, body);
        assert_eq!(spans.len(), 3);
        assert!(spans[1].style.add_modifier.contains(Modifier::UNDERLINED));

        assert_eq!(body_spans("", Style::default()).len(), 1);
    }
}
