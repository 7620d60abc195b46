use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{backend::Backend, Terminal};

use crate::app::App;
use crate::config::Config;
use crate::ui;

/// Result of handling a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleResult {
    /// Continue running the app
    Continue,
    /// Exit the app
    Exit,
}

/// Run the main application loop.
pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    config: &Config,
) -> io::Result<()> {
    let behavior = &config.behavior;
    let mut last_cursor_toggle = Instant::now();

    loop {
        // Advance the session with any finished requests
        app.process_completions();

        // Tick toast notifications to expire old ones
        app.tick();

        terminal.draw(|f| ui::ui(f, app, config))?;

        if last_cursor_toggle.elapsed() >= Duration::from_millis(behavior.cursor_blink_ms) {
            app.toggle_cursor();
            last_cursor_toggle = Instant::now();
        }

        if event::poll(Duration::from_millis(behavior.poll_ms))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // Reset cursor to visible on any keypress
                    app.view.cursor_visible = true;
                    last_cursor_toggle = Instant::now();

                    if handle_key_event(app, key.code, key.modifiers) == HandleResult::Exit {
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Handle a key event and return whether to continue or exit.
pub fn handle_key_event(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> HandleResult {
    // Global shortcuts (work in all modes)
    match code {
        KeyCode::Char('c') | KeyCode::Char('q') if modifiers.contains(KeyModifiers::CONTROL) => {
            return HandleResult::Exit;
        }
        _ => {}
    }

    // An open dialog takes every other key
    if app.handle_dialog_key(code) {
        return HandleResult::Continue;
    }

    match code {
        KeyCode::Enter => app.connect(),
        KeyCode::Esc => app.cancel(),
        KeyCode::Char(c) => app.view.input.insert(c),
        KeyCode::Backspace => app.view.input.backspace(),
        KeyCode::Delete => app.view.input.delete(),
        KeyCode::Left => app.view.input.move_left(),
        KeyCode::Right => app.view.input.move_right(),
        KeyCode::Home => app.view.input.home(),
        KeyCode::End => app.view.input.end(),
        _ => {}
    }
    HandleResult::Continue
}
