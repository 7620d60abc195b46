//! UI module for bcl-diag.
//!
//! This module contains all UI rendering logic including:
//! - Main layout (status line, key input, key hints)
//! - Modal dialogs for warnings and redirect confirmation
//! - Toast notifications

pub mod dialog;
mod render;
pub mod toast;

pub use dialog::{Dialog, DialogAction, DialogResult, DialogState};
pub use render::ui;
pub use toast::{render_toasts, Toast, ToastLevel, ToastState};
