// ABOUTME: Shared constants and data-directory paths for prdsmith
// ABOUTME: Idea length limits, session title length and the default database location

use std::env;
use std::path::PathBuf;

/// Minimum number of characters an idea needs before generation is attempted
pub const MIN_IDEA_CHARS: usize = 10;

/// Session titles derived from an idea keep this many characters
pub const SESSION_TITLE_MAX_CHARS: usize = 50;

/// Get the path to the prdsmith data directory (~/.prdsmith)
pub fn data_dir() -> PathBuf {
    // HOME first so tests can redirect it
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".prdsmith")
    } else {
        dirs::home_dir()
            .unwrap_or_else(env::temp_dir)
            .join(".prdsmith")
    }
}

/// Get the path to the default SQLite database (~/.prdsmith/prdsmith.db)
pub fn database_file() -> PathBuf {
    data_dir().join("prdsmith.db")
}
