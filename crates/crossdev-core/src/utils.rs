//! Shared utility functions for crossdev crates

use anyhow::anyhow;
use std::path::PathBuf;

/// Get the user's home directory
///
/// HOME wins over dirs::home_dir() so that containers overriding HOME
/// and the family scripts (which use $HOME) agree on the location.
pub fn get_home_dir() -> anyhow::Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Escape newlines so multi-line output fits on one log line
pub fn one_line(text: &str) -> String {
    text.replace('\n', "\\n")
}
