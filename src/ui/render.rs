use ratatui::{
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, StatusTone, TITLE};
use crate::config::{Config, ThemeConfig};

use super::toast::render_toasts;

/// Width of the main dialog in columns.
const PANEL_WIDTH: u16 = 72;

/// Height of the main dialog in rows.
const PANEL_HEIGHT: u16 = 11;

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Main UI rendering function.
pub fn ui(f: &mut Frame, app: &App, config: &Config) {
    let theme = &config.theme;
    let bg_color = ThemeConfig::to_color(&theme.bg_primary);

    f.render_widget(Block::default().style(Style::default().bg(bg_color)), f.size());

    let panel = centered(f.size(), PANEL_WIDTH, PANEL_HEIGHT);
    let block = Block::default()
        .title(format!(" {} ", TITLE))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ThemeConfig::to_color(&theme.border)))
        .style(Style::default().bg(bg_color));
    let inner = block.inner(panel).inner(&Margin {
        horizontal: 1,
        vertical: 0,
    });
    f.render_widget(block, panel);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(2),    // Status
            Constraint::Length(3), // Key input
            Constraint::Length(1), // Key hints
        ])
        .split(inner);

    // Status line
    let status_color = match app.status_tone() {
        StatusTone::Idle => theme.status_idle,
        StatusTone::Busy => theme.status_busy,
        StatusTone::Success => theme.status_success,
        StatusTone::Error => theme.status_error,
    };
    let status = Paragraph::new(app.view.status.as_str())
        .style(Style::default().fg(ThemeConfig::to_color(&status_color)))
        .wrap(Wrap { trim: true });
    f.render_widget(status, chunks[0]);

    // Key input with blinking cursor
    let (before, after) = app.view.input.split();
    let cursor_char = if app.view.cursor_visible { "▎" } else { " " };
    let input_text = Line::from(vec![
        Span::raw(before),
        Span::styled(cursor_char, Style::default().fg(Color::Cyan)),
        Span::raw(after),
    ]);
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .style(Style::default().bg(ThemeConfig::to_color(&theme.bg_input)));
    let input = Paragraph::new(input_text)
        .style(Style::default().fg(Color::White))
        .block(input_block);
    f.render_widget(input, chunks[1]);

    // Key hints; unavailable actions are dimmed
    let hint = |key: &'static str, label: &'static str, enabled: bool| {
        let (key_style, label_style) = if enabled {
            (Style::default().fg(Color::Yellow), Style::default().fg(Color::Gray))
        } else {
            (
                Style::default().fg(Color::DarkGray),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
            )
        };
        vec![
            Span::styled(format!("[{}]", key), key_style),
            Span::styled(format!(" {}  ", label), label_style),
        ]
    };
    let mut hints = hint("Enter", "Connect", app.can_connect());
    hints.extend(hint("Esc", "Cancel", app.session.is_pending()));
    hints.extend(hint("Ctrl+Q", "Quit", true));
    f.render_widget(Paragraph::new(Line::from(hints)), chunks[2]);

    app.view.dialogs.render(f, f.size());
    render_toasts(f, &app.view.toasts);
}
