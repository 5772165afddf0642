use qrcode::{Color as Module, EcLevel, QrCode};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph, Wrap},
    Frame,
};

use super::Modal;
use crate::app::LinkStatus;
use crate::config::ThemeConfig;

const QUIET_ZONE: usize = 2;

/// QR code as half-block rows, two modules per character cell.
/// Light modules are drawn filled so it scans on a dark terminal.
pub fn qr_lines(data: &str) -> Option<Vec<String>> {
    let code = QrCode::with_error_correction_level(data, EcLevel::L).ok()?;
    let width = code.width();
    let colors = code.to_colors();
    let size = width + 2 * QUIET_ZONE;

    // Quiet zone counts as light
    let light = |x: usize, y: usize| {
        if x < QUIET_ZONE || y < QUIET_ZONE || x >= width + QUIET_ZONE || y >= width + QUIET_ZONE {
            return true;
        }
        colors[(y - QUIET_ZONE) * width + (x - QUIET_ZONE)] == Module::Light
    };

    let rows = (0..size)
        .step_by(2)
        .map(|y| {
            (0..size)
                .map(|x| {
                    let top = light(x, y);
                    let bottom = y + 1 >= size || light(x, y + 1);
                    match (top, bottom) {
                        (true, true) => '█',
                        (true, false) => '▀',
                        (false, true) => '▄',
                        (false, false) => ' ',
                    }
                })
                .collect()
        })
        .collect();
    Some(rows)
}

/// Modal shown while pairing with the phone
pub fn render_link_modal(f: &mut Frame, area: Rect, link: &LinkStatus, theme: &ThemeConfig) {
    let (instructions, detail, detail_color) = match link {
        LinkStatus::Pending(Some(uri)) => (
            "Open Signal on your phone, go to Settings > Linked devices and scan this code:",
            uri.clone(),
            theme.secondary(),
        ),
        LinkStatus::Pending(None) => (
            "Waiting for signal-cli to print the pairing link...",
            String::new(),
            theme.fg(),
        ),
        LinkStatus::Failed(code) => (
            "Link failed.",
            match code {
                Some(code) => format!("signal-cli exited with {}", code),
                None => "signal-cli was killed".to_string(),
            },
            theme.error(),
        ),
        LinkStatus::Idle | LinkStatus::Linked => return,
    };

    let qr = match link {
        LinkStatus::Pending(Some(uri)) => qr_lines(uri).unwrap_or_default(),
        _ => Vec::new(),
    };
    let qr_width = qr.first().map_or(0, |row| row.chars().count()) as u16;
    let qr_height = qr.len() as u16;

    let modal = Modal::new(" Link device ", theme);
    let modal_area = modal.centered_rect(72.max(qr_width + 4), 12 + qr_height, area);

    f.render_widget(Clear, modal_area);
    let block = modal.block();
    let inner_area = block.inner(modal_area);
    f.render_widget(block, modal_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),         // instructions
            Constraint::Length(qr_height), // QR code
            Constraint::Min(3),            // URI or error
            Constraint::Length(1),         // hint
        ])
        .split(inner_area);

    let text = Paragraph::new(Line::from(Span::styled(
        instructions,
        Style::default().fg(theme.fg()),
    )))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(text, chunks[0]);

    if !qr.is_empty() {
        let qr_style = Style::default().fg(Color::White).bg(Color::Black);
        let lines: Vec<Line> = qr
            .into_iter()
            .map(|row| Line::from(Span::styled(row, qr_style)))
            .collect();
        f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), chunks[1]);
    }

    // Long URIs wrap; keep them unbroken otherwise so they can be copied
    let detail = Paragraph::new(Line::from(Span::styled(
        detail,
        Style::default().fg(detail_color),
    )))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: false });
    f.render_widget(detail, chunks[2]);

    let hint = if matches!(link, LinkStatus::Failed(_)) {
        "Esc dismiss  L retry"
    } else {
        "Waiting for the phone to confirm"
    };
    let hint = Paragraph::new(Line::from(Span::styled(
        hint,
        Style::default().fg(theme.fg_muted()),
    )))
    .alignment(Alignment::Center);
    f.render_widget(hint, chunks[3]);
}
