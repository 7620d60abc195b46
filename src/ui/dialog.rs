//! Modal dialog system for user interaction.
//!
//! Warnings (with an optional, scrollable detail report) and yes/no
//! confirmations. While a dialog is open it receives every key press.

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Result of handling a key event in a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogResult {
    /// Continue showing the dialog.
    Continue,
    /// Closed with a negative answer.
    Cancel,
    /// Closed with a positive answer.
    Confirm,
}

/// A dialog action with label and key binding.
#[derive(Debug, Clone)]
pub struct DialogAction {
    pub label: String,
    pub key: KeyCode,
    pub result: DialogResult,
}

impl DialogAction {
    pub fn new(label: impl Into<String>, key: KeyCode, result: DialogResult) -> Self {
        Self {
            label: label.into(),
            key,
            result,
        }
    }

    /// Create a confirm action (Enter key).
    pub fn confirm(label: impl Into<String>) -> Self {
        Self::new(label, KeyCode::Enter, DialogResult::Confirm)
    }

    /// Create a Yes action (y key).
    pub fn yes() -> Self {
        Self::new("Yes", KeyCode::Char('y'), DialogResult::Confirm)
    }

    /// Create a No action (n key).
    pub fn no() -> Self {
        Self::new("No", KeyCode::Char('n'), DialogResult::Cancel)
    }
}

/// A modal dialog.
#[derive(Debug, Clone)]
pub struct Dialog {
    pub title: String,
    pub message: String,
    /// Extra text hidden until the user asks for it.
    pub detail: Option<String>,
    pub show_detail: bool,
    /// First visible detail line.
    pub detail_scroll: u16,
    pub actions: Vec<DialogAction>,
    /// Width as percentage of screen.
    pub width_percent: u16,
    /// Height as percentage of screen.
    pub height_percent: u16,
}

impl Dialog {
    /// Create a dialog with no actions; see [`Dialog::warning`] and [`Dialog::confirm`].
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            detail: None,
            show_detail: false,
            detail_scroll: 0,
            actions: Vec::new(),
            width_percent: 60,
            height_percent: 30,
        }
    }

    /// Set the dialog actions.
    pub fn with_actions(mut self, actions: Vec<DialogAction>) -> Self {
        self.actions = actions;
        self
    }

    /// Attach a detail report, toggled with `d`.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Warning dialog; Enter or Esc dismisses it.
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message).with_actions(vec![
            DialogAction::confirm("OK"),
            DialogAction::new("Close", KeyCode::Esc, DialogResult::Confirm),
        ])
    }

    /// Confirmation dialog with Yes/No buttons. Esc answers No.
    pub fn confirm(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message).with_actions(vec![
            DialogAction::yes(),
            DialogAction::no(),
            DialogAction::new("", KeyCode::Esc, DialogResult::Cancel),
        ])
    }

    /// Handle a key event. Returns the result of the action if one matches.
    pub fn handle_key(&mut self, key: KeyCode) -> DialogResult {
        if self.detail.is_some() {
            match key {
                KeyCode::Char('d') => {
                    self.show_detail = !self.show_detail;
                    self.detail_scroll = 0;
                    return DialogResult::Continue;
                }
                KeyCode::Up if self.show_detail => {
                    self.detail_scroll = self.detail_scroll.saturating_sub(1);
                    return DialogResult::Continue;
                }
                KeyCode::Down if self.show_detail => {
                    if self.detail_scroll < self.max_detail_scroll() {
                        self.detail_scroll += 1;
                    }
                    return DialogResult::Continue;
                }
                _ => {}
            }
        }

        self.actions
            .iter()
            .find(|action| action.key == key)
            .map(|action| action.result)
            .unwrap_or(DialogResult::Continue)
    }

    fn max_detail_scroll(&self) -> u16 {
        let lines = self.detail.as_deref().map_or(0, |d| d.lines().count());
        u16::try_from(lines.saturating_sub(1)).unwrap_or(u16::MAX)
    }

    /// Calculate the dialog area within the given frame area.
    pub fn area(&self, frame_area: Rect) -> Rect {
        let height_percent = if self.show_detail {
            80
        } else {
            self.height_percent
        };
        let width = (frame_area.width as u32 * self.width_percent as u32 / 100) as u16;
        let height = (frame_area.height as u32 * height_percent as u32 / 100) as u16;
        let x = (frame_area.width.saturating_sub(width)) / 2;
        let y = (frame_area.height.saturating_sub(height)) / 2;
        Rect::new(x, y, width, height)
    }

    /// Render the dialog to the frame.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let dialog_area = self.area(area);

        // Clear the area behind the dialog
        frame.render_widget(Clear, dialog_area);

        let block = Block::default()
            .title(format!(" {} ", self.title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .style(Style::default().bg(Color::Black));

        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let detail = self.detail.as_deref().filter(|_| self.show_detail);
        let chunks = if detail.is_some() {
            Layout::vertical([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(inner)
        } else {
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(inner)
        };

        let message = Paragraph::new(self.message.as_str())
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::White));
        frame.render_widget(message, chunks[0]);

        if let Some(detail) = detail {
            let details = Paragraph::new(detail)
                .block(
                    Block::default()
                        .title(" Details ")
                        .borders(Borders::TOP)
                        .border_style(Style::default().fg(Color::DarkGray)),
                )
                .style(Style::default().fg(Color::Gray))
                .scroll((self.detail_scroll, 0));
            frame.render_widget(details, chunks[1]);
        }

        // Action hints
        let mut hints: Vec<Span> = self
            .actions
            .iter()
            .filter(|action| !action.label.is_empty())
            .flat_map(|action| {
                let key_name = match action.key {
                    KeyCode::Enter => "Enter".to_string(),
                    KeyCode::Esc => "Esc".to_string(),
                    KeyCode::Char(c) => c.to_string(),
                    _ => "?".to_string(),
                };
                vec![
                    Span::styled(format!("[{}]", key_name), Style::default().fg(Color::Yellow)),
                    Span::raw(format!(" {}  ", action.label)),
                ]
            })
            .collect();
        if self.detail.is_some() {
            let label = if self.show_detail {
                " Hide Details"
            } else {
                " Show Details"
            };
            hints.push(Span::styled("[d]", Style::default().fg(Color::Yellow)));
            hints.push(Span::raw(label));
        }
        let hints_paragraph = Paragraph::new(Line::from(hints)).style(Style::default().fg(Color::Gray));
        frame.render_widget(hints_paragraph, chunks[chunks.len() - 1]);
    }
}

/// Dialog state for the application.
#[derive(Debug, Default)]
pub struct DialogState {
    /// Currently active dialog, if any.
    pub active: Option<Dialog>,
}

impl DialogState {
    /// Show a dialog.
    pub fn show(&mut self, dialog: Dialog) {
        self.active = Some(dialog);
    }

    /// Close the current dialog.
    pub fn close(&mut self) {
        self.active = None;
    }

    /// Check if a dialog is active.
    pub fn has_dialog(&self) -> bool {
        self.active.is_some()
    }

    /// Handle a key event if a dialog is active.
    /// Returns None if no dialog is active.
    pub fn handle_key(&mut self, key: KeyCode) -> Option<DialogResult> {
        self.active.as_mut().map(|dialog| dialog.handle_key(key))
    }

    /// Render the dialog if active.
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if let Some(dialog) = &self.active {
            dialog.render(frame, area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_action_yes_no() {
        let yes = DialogAction::yes();
        let no = DialogAction::no();
        assert_eq!(yes.key, KeyCode::Char('y'));
        assert_eq!(yes.result, DialogResult::Confirm);
        assert_eq!(no.key, KeyCode::Char('n'));
        assert_eq!(no.result, DialogResult::Cancel);
    }

    #[test]
    fn test_warning_dismissed_by_enter_or_esc() {
        let mut dialog = Dialog::warning("Connection Failed", "Connection failed: Invalid Auth Key.");
        assert_eq!(dialog.handle_key(KeyCode::Enter), DialogResult::Confirm);
        assert_eq!(dialog.handle_key(KeyCode::Esc), DialogResult::Confirm);
        assert_eq!(dialog.handle_key(KeyCode::Char('x')), DialogResult::Continue);
    }

    #[test]
    fn test_confirm_esc_means_no() {
        let mut dialog = Dialog::confirm("Connection Redirect", "Redirect to https://example.com/?");
        assert_eq!(dialog.handle_key(KeyCode::Char('y')), DialogResult::Confirm);
        assert_eq!(dialog.handle_key(KeyCode::Char('n')), DialogResult::Cancel);
        assert_eq!(dialog.handle_key(KeyCode::Esc), DialogResult::Cancel);
    }

    #[test]
    fn test_detail_toggle_and_scroll() {
        let mut dialog = Dialog::warning("Unrecognized Response", "Server returned OK")
            .with_detail("line 1\nline 2\nline 3");
        assert!(!dialog.show_detail);

        // Scrolling does nothing while hidden
        assert_eq!(dialog.handle_key(KeyCode::Down), DialogResult::Continue);
        assert_eq!(dialog.detail_scroll, 0);

        assert_eq!(dialog.handle_key(KeyCode::Char('d')), DialogResult::Continue);
        assert!(dialog.show_detail);

        dialog.handle_key(KeyCode::Down);
        dialog.handle_key(KeyCode::Down);
        dialog.handle_key(KeyCode::Down);
        assert_eq!(dialog.detail_scroll, 2); // Clamped to last line

        dialog.handle_key(KeyCode::Up);
        assert_eq!(dialog.detail_scroll, 1);

        dialog.handle_key(KeyCode::Char('d'));
        assert!(!dialog.show_detail);
        assert_eq!(dialog.detail_scroll, 0);
    }

    #[test]
    fn test_d_without_detail_is_ignored() {
        let mut dialog = Dialog::warning("Malformed Auth Key", "Your key is 5 characters.");
        assert_eq!(dialog.handle_key(KeyCode::Char('d')), DialogResult::Continue);
        assert!(!dialog.show_detail);
    }

    #[test]
    fn test_dialog_area_calculation() {
        let mut dialog = Dialog::warning("Test", "Message").with_detail("line");
        let area = dialog.area(Rect::new(0, 0, 100, 100));

        assert_eq!(area.width, 60);
        assert_eq!(area.height, 30);
        assert_eq!(area.x, 20); // Centered
        assert_eq!(area.y, 35); // Centered

        // Details grow the dialog
        dialog.handle_key(KeyCode::Char('d'));
        let area = dialog.area(Rect::new(0, 0, 100, 100));
        assert_eq!(area.height, 80);
        assert_eq!(area.y, 10);
    }

    #[test]
    fn test_dialog_state_show_close() {
        let mut state = DialogState::default();
        assert!(state.handle_key(KeyCode::Enter).is_none());

        state.show(Dialog::warning("Test", "Message"));
        assert!(state.has_dialog());
        assert_eq!(state.handle_key(KeyCode::Enter), Some(DialogResult::Confirm));

        state.close();
        assert!(!state.has_dialog());
    }
}
