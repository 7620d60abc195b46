//! BCL auth key normalization.
//!
//! A key is exactly 32 ASCII letters or digits. Keys pasted with surrounding
//! whitespace are accepted after trimming, and the caller is told so it can
//! let the user know the key was corrected.

use std::fmt;

use thiserror::Error;

/// Required key length in characters.
pub const KEY_LENGTH: usize = 32;

/// A validated BCL auth key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// The key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Mask the key for logs, showing only the first and last 4 characters.
    pub fn masked(&self) -> String {
        mask_key(&self.0)
    }
}

// Keys never reach Debug output in full.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a successful [`normalize`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedKey {
    pub credential: Credential,
    /// The raw input only passed after trimming surrounding whitespace.
    pub corrected: bool,
}

/// Why a raw key was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyFormatError {
    /// Wrong number of characters.
    #[error("key length is {0}, must be 32")]
    Length(usize),
    /// Right length, but not purely alphanumeric.
    #[error("key must be alphanumeric only")]
    Charset,
}

impl KeyFormatError {
    /// Longer explanation for the warning dialog.
    pub fn guidance(&self) -> String {
        match self {
            Self::Length(n) => format!(
                "Your key is {} character{}.  The key can only contain 32 non-whitespace alphanumeric characters.",
                n,
                if *n == 1 { "" } else { "s" }
            ),
            Self::Charset => {
                "The key can only contain 32 non-whitespace alphanumeric characters.".to_string()
            }
        }
    }
}

fn is_well_formed(key: &str) -> bool {
    key.chars().count() == KEY_LENGTH && key.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Validate a raw key, trimming surrounding whitespace if that makes it valid.
pub fn normalize(raw: &str) -> Result<NormalizedKey, KeyFormatError> {
    if is_well_formed(raw) {
        return Ok(NormalizedKey {
            credential: Credential(raw.to_string()),
            corrected: false,
        });
    }

    let trimmed = raw.trim();
    if is_well_formed(trimmed) {
        return Ok(NormalizedKey {
            credential: Credential(trimmed.to_string()),
            corrected: true,
        });
    }

    // Report against the raw input, the way the user typed it.
    let length = raw.chars().count();
    if length != KEY_LENGTH {
        Err(KeyFormatError::Length(length))
    } else {
        Err(KeyFormatError::Charset)
    }
}

/// Mask a key for display, showing only first and last 4 characters.
///
/// Examples:
/// - "abcdEFGH12345678abcdEFGH12345678" -> "abcd...5678"
/// - "short" -> "*****"
/// - "" -> ""
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
