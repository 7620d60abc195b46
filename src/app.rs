use crossterm::event::KeyCode;
use reqwest::Url;
use tracing::debug;

use crate::key::Credential;
use crate::session::{Presenter, SessionResult, SessionState, VerificationSession, Warning};
use crate::ui::{Dialog, DialogResult, DialogState, ToastState};

/// Window title.
pub const TITLE: &str = "BCL Auth Test (v1.1)";

/// Status line before the first attempt.
pub const PROMPT: &str = "Please enter your BCL Auth Key:";

/// Which session prompt the open dialog answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Redirect,
    Warning,
}

/// Coarse status used to pick the status line color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Idle,
    Busy,
    Success,
    Error,
}

/// Single-line key input with a cursor.
///
/// The cursor is a character index, not a byte offset.
#[derive(Debug, Default)]
pub struct KeyInput {
    pub text: String,
    pub cursor: usize,
}

impl KeyInput {
    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map_or(self.text.len(), |(i, _)| i)
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Insert a character at the cursor.
    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    /// Delete the character under the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Replace the whole text, cursor at the end.
    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.end();
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text before and after the cursor.
    pub fn split(&self) -> (&str, &str) {
        self.text.split_at(self.byte_index(self.cursor))
    }
}

/// Everything the session reports, as shown on screen.
#[derive(Debug)]
pub struct ViewState {
    pub status: String,
    pub input: KeyInput,
    /// Whether the session allows a new attempt.
    pub connect_allowed: bool,
    pub dialogs: DialogState,
    pub prompt: Option<Prompt>,
    pub toasts: ToastState,
    pub cursor_visible: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            status: PROMPT.to_string(),
            input: KeyInput::default(),
            connect_allowed: true,
            dialogs: DialogState::default(),
            prompt: None,
            toasts: ToastState::default(),
            cursor_visible: true,
        }
    }
}

impl Presenter for ViewState {
    fn status_changed(&mut self, text: &str) {
        self.status = text.to_string();
    }

    fn blocking_warning(&mut self, warning: &Warning) {
        let mut dialog = Dialog::warning(&warning.title, &warning.summary);
        if let Some(detail) = &warning.detail {
            dialog = dialog.with_detail(detail);
        }
        self.dialogs.show(dialog);
        self.prompt = Some(Prompt::Warning);
    }

    fn redirect_confirm(&mut self, target: &Url) {
        self.dialogs.show(Dialog::confirm(
            "Connection Redirect",
            format!("Redirect to {}?", target),
        ));
        self.prompt = Some(Prompt::Redirect);
    }

    fn connect_enabled(&mut self, enabled: bool) {
        self.connect_allowed = enabled;
    }

    fn key_corrected(&mut self, credential: &Credential) {
        self.input.set(credential.as_str());
        self.toasts
            .warning("Removed whitespace around the key; continuing with the fixed key");
    }
}

/// Application state for the diagnostic dialog.
pub struct App {
    pub session: VerificationSession,
    pub view: ViewState,
}

impl App {
    pub fn new(session: VerificationSession) -> Self {
        Self {
            session,
            view: ViewState::default(),
        }
    }

    /// Whether Connect is currently available.
    pub fn can_connect(&self) -> bool {
        self.view.connect_allowed && !self.view.input.is_empty() && !self.session.is_busy()
    }

    /// Start an attempt with the typed key.
    pub fn connect(&mut self) {
        if !self.can_connect() {
            return;
        }
        let raw = self.view.input.text.clone();
        if let Err(err) = self.session.start(&raw, &mut self.view) {
            self.view.toasts.error(err.to_string());
        }
    }

    /// Cancel the in-flight request, if any.
    pub fn cancel(&mut self) {
        if let Err(err) = self.session.cancel(&mut self.view) {
            debug!("cancel ignored: {}", err);
        }
    }

    /// Process finished requests.
    ///
    /// Call this in the event loop. Returns true if the session advanced.
    pub fn process_completions(&mut self) -> bool {
        self.session.process_completions(&mut self.view)
    }

    /// Route a key to the open dialog.
    ///
    /// Returns false if no dialog is open.
    pub fn handle_dialog_key(&mut self, key: KeyCode) -> bool {
        if !self.view.dialogs.has_dialog() {
            return false;
        }
        let result = self
            .view
            .dialogs
            .handle_key(key)
            .unwrap_or(DialogResult::Continue);
        if result == DialogResult::Continue {
            return true;
        }

        self.view.dialogs.close();
        let answered = match self.view.prompt.take() {
            Some(Prompt::Redirect) => self
                .session
                .confirm_redirect(result == DialogResult::Confirm, &mut self.view),
            Some(Prompt::Warning) => self.session.acknowledge(&mut self.view),
            None => Ok(()),
        };
        if let Err(err) = answered {
            debug!("dialog answer ignored: {}", err);
        }
        true
    }

    /// Expire old toasts.
    pub fn tick(&mut self) {
        self.view.toasts.tick();
    }

    /// Toggle cursor visibility for blinking effect.
    pub fn toggle_cursor(&mut self) {
        self.view.cursor_visible = !self.view.cursor_visible;
    }

    /// Color class for the status line.
    pub fn status_tone(&self) -> StatusTone {
        match self.session.state() {
            SessionState::Idle => StatusTone::Idle,
            SessionState::Probing(_) | SessionState::ConfirmingRedirect { .. } => StatusTone::Busy,
            SessionState::AwaitingAcknowledgment(result) | SessionState::Finished(result) => {
                match result {
                    SessionResult::Success => StatusTone::Success,
                    SessionResult::Cancelled => StatusTone::Idle,
                    _ => StatusTone::Error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_input_editing() {
        let mut input = KeyInput::default();
        for c in "abd".chars() {
            input.insert(c);
        }
        input.move_left();
        input.insert('c');
        assert_eq!(input.text, "abcd");
        assert_eq!(input.split(), ("abc", "d"));

        input.home();
        input.delete();
        assert_eq!(input.text, "bcd");

        input.end();
        input.backspace();
        assert_eq!(input.text, "bc");
        assert_eq!(input.cursor, 2);
    }

    #[test]
    fn test_key_input_multibyte() {
        let mut input = KeyInput::default();
        input.set("é1");
        input.move_left();
        input.backspace();
        assert_eq!(input.text, "1");
        assert_eq!(input.cursor, 0);
        input.move_left();
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn test_presenter_warning_opens_dialog() {
        let mut view = ViewState::default();
        view.blocking_warning(&Warning {
            title: "Connection Failed".to_string(),
            summary: "Connection failed: Invalid Auth Key.".to_string(),
            detail: Some("BCL Key".to_string()),
        });
        assert_eq!(view.prompt, Some(Prompt::Warning));
        let dialog = view.dialogs.active.as_ref().unwrap();
        assert_eq!(dialog.title, "Connection Failed");
        assert_eq!(dialog.detail.as_deref(), Some("BCL Key"));
    }

    #[test]
    fn test_presenter_redirect_opens_confirm() {
        let mut view = ViewState::default();
        let target = Url::parse("https://bcl.nrel.gov/api/search/").unwrap();
        view.redirect_confirm(&target);
        assert_eq!(view.prompt, Some(Prompt::Redirect));
        assert_eq!(
            view.dialogs.active.as_ref().unwrap().message,
            "Redirect to https://bcl.nrel.gov/api/search/?"
        );
    }
}
