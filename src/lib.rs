//! bcl-diag - verify a BCL auth key from the terminal.
//!
//! This library exposes the core modules for testing and reuse.

pub mod app;
pub mod classify;
pub mod config;
pub mod input;
pub mod key;
pub mod probe;
pub mod session;
pub mod ui;
