//! Rendering and key handling tests for the diagnostic dialog.
//!
//! Uses ratatui's TestBackend to render to a virtual terminal buffer, then
//! checks the plain text on screen.

use std::sync::Arc;

use async_trait::async_trait;
use bcl_diag::app::{App, Prompt, PROMPT, TITLE};
use bcl_diag::config::{Config, ProbeConfig};
use bcl_diag::input::{handle_key_event, HandleResult};
use bcl_diag::probe::{CompletedExchange, ProbeRequest, Transport};
use bcl_diag::session::{SessionResult, SessionState, VerificationSession};
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{backend::TestBackend, Terminal};
use reqwest::Url;

const TERMINAL_WIDTH: u16 = 100;
const TERMINAL_HEIGHT: u16 = 30;

/// Never reached: these tests only exercise paths that issue no request.
struct UnreachableTransport;

#[async_trait]
impl Transport for UnreachableTransport {
    async fn get(&self, request: &ProbeRequest) -> CompletedExchange {
        CompletedExchange::response(request.url.clone(), 500, "")
    }
}

fn app() -> App {
    let probe = ProbeConfig::new(
        Url::parse("http://ip.test/ip.php").unwrap(),
        Url::parse("http://bcl.test/api/search/").unwrap(),
    );
    App::new(VerificationSession::new(Arc::new(UnreachableTransport), probe))
}

/// Helper to convert a ratatui Buffer to a plain text string (no ANSI codes).
fn buffer_to_string(buffer: &ratatui::buffer::Buffer) -> String {
    let mut output = String::new();
    for y in 0..buffer.area().height {
        for x in 0..buffer.area().width {
            output.push_str(buffer.get(x, y).symbol());
        }
        output.push('\n');
    }
    output
}

fn render(app: &App) -> String {
    let backend = TestBackend::new(TERMINAL_WIDTH, TERMINAL_HEIGHT);
    let mut terminal = Terminal::new(backend).unwrap();
    let config = Config::default();
    terminal
        .draw(|f| bcl_diag::ui::ui(f, app, &config))
        .unwrap();
    buffer_to_string(terminal.backend().buffer())
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        handle_key_event(app, KeyCode::Char(c), KeyModifiers::NONE);
    }
}

#[test]
fn idle_screen_shows_prompt_and_hints() {
    let app = app();
    let output = render(&app);

    assert!(output.contains(TITLE));
    assert!(output.contains(PROMPT));
    assert!(output.contains("[Enter] Connect"));
    assert!(output.contains("[Esc] Cancel"));
    assert!(output.contains("[Ctrl+Q] Quit"));
}

#[test]
fn typed_key_is_echoed() {
    let mut app = app();
    type_text(&mut app, "abc123");

    assert_eq!(app.view.input.text, "abc123");
    assert!(app.can_connect());
    assert!(render(&app).contains("abc123"));
}

#[test]
fn connect_is_unavailable_without_input() {
    let mut app = app();
    assert!(!app.can_connect());

    handle_key_event(&mut app, KeyCode::Enter, KeyModifiers::NONE);
    assert_eq!(app.session.state(), &SessionState::Idle);
}

#[test]
fn malformed_key_shows_warning_until_dismissed() {
    let mut app = app();
    type_text(&mut app, "short");
    handle_key_event(&mut app, KeyCode::Enter, KeyModifiers::NONE);

    assert_eq!(app.view.prompt, Some(Prompt::Warning));
    assert!(!app.can_connect());
    let output = render(&app);
    assert!(output.contains("Malformed Auth Key"));
    assert!(output.contains("Your key is 5 characters."));
    assert!(output.contains("[Enter] OK"));

    // Typing goes to the dialog, not the input
    handle_key_event(&mut app, KeyCode::Char('x'), KeyModifiers::NONE);
    assert_eq!(app.view.input.text, "short");

    handle_key_event(&mut app, KeyCode::Enter, KeyModifiers::NONE);
    assert!(!app.view.dialogs.has_dialog());
    assert_eq!(app.view.prompt, None);
    assert_eq!(
        app.session.state(),
        &SessionState::Finished(SessionResult::MalformedKey(
            "key length is 5, must be 32".to_string()
        ))
    );
    assert_eq!(app.view.status, "Malformed Auth Key");
    assert!(app.can_connect());
}

#[test]
fn quit_shortcuts_exit() {
    let mut app = app();
    assert_eq!(
        handle_key_event(&mut app, KeyCode::Char('q'), KeyModifiers::CONTROL),
        HandleResult::Exit
    );
    assert_eq!(
        handle_key_event(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL),
        HandleResult::Exit
    );
    assert_eq!(
        handle_key_event(&mut app, KeyCode::Char('q'), KeyModifiers::NONE),
        HandleResult::Continue
    );
}

#[test]
fn escape_without_request_is_ignored() {
    let mut app = app();
    handle_key_event(&mut app, KeyCode::Esc, KeyModifiers::NONE);

    assert_eq!(app.session.state(), &SessionState::Idle);
    assert_eq!(app.view.status, PROMPT);
}

#[test]
fn editing_keys_move_the_cursor() {
    let mut app = app();
    type_text(&mut app, "abd");
    handle_key_event(&mut app, KeyCode::Left, KeyModifiers::NONE);
    handle_key_event(&mut app, KeyCode::Char('c'), KeyModifiers::NONE);
    handle_key_event(&mut app, KeyCode::Home, KeyModifiers::NONE);
    handle_key_event(&mut app, KeyCode::Delete, KeyModifiers::NONE);
    handle_key_event(&mut app, KeyCode::End, KeyModifiers::NONE);
    handle_key_event(&mut app, KeyCode::Backspace, KeyModifiers::NONE);

    assert_eq!(app.view.input.text, "bc");
    assert_eq!(app.view.input.cursor, 2);
}
