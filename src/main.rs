//! bcl-diag - verify a BCL auth key from the terminal.
//!
//! Checks the public IP, then asks the BCL search API whether the key is
//! accepted, and explains what went wrong when it is not.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bcl_diag::app::App;
use bcl_diag::config::Config;
use bcl_diag::input;
use bcl_diag::probe::HttpTransport;
use bcl_diag::session::VerificationSession;

/// Log file path: ~/.cache/bcl-diag/bcl-diag.log
fn log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("bcl-diag").join("bcl-diag.log"))
}

/// Send tracing output to the log file; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let Some(path) = log_path() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(err) = init_logging() {
        eprintln!("Warning: logging disabled: {:#}", err);
    }

    // Load configuration; first run leaves an editable copy of the defaults
    let config = Config::load();
    if let Some(path) = Config::default_path() {
        match config.write_if_missing(&path) {
            Ok(true) => info!(path = %path.display(), "wrote default config"),
            Ok(false) => {}
            Err(err) => warn!("could not write default config: {:#}", err),
        }
    }
    let probe = config.probe_config().context("Invalid configuration")?;
    let transport = HttpTransport::new()?;
    info!(ip_url = %probe.ip_url, search_url = %probe.search_url, "bcl-diag starting");

    let session = VerificationSession::new(Arc::new(transport), probe);
    let mut app = App::new(session);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let res = input::run_app(&mut terminal, &mut app, &config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Handle any errors
    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
