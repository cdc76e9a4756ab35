// Logging module - diagnostics, request debugging and conversation logs
pub mod conversation_logger;
pub mod request_logger;

use anyhow::{Context, Result};
use std::path::PathBuf;

pub use conversation_logger::ConversationLogger;

pub use request_logger::{log_request, log_response};

/// Safely truncate a string to a maximum number of characters
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        // Reserve space for "..." suffix
        let trunc_chars = max_chars.saturating_sub(3);
        format!("{}...", s.chars().take(trunc_chars).collect::<String>())
    }
}

/// Initialize the `log` facade.
///
/// `RUST_LOG` wins when set; otherwise warnings only, or info with `verbose`.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default_level);
    // A second init (tests, embedding) is harmless
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}

/// Get or create the base deskchat directory (~/.deskchat)
pub fn get_deskchat_dir() -> Result<PathBuf> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Failed to get home directory")?;

    let deskchat_dir = PathBuf::from(home_dir).join(".deskchat");

    if !deskchat_dir.exists() {
        std::fs::create_dir_all(&deskchat_dir)
            .context("Failed to create deskchat directory")?;
    }

    Ok(deskchat_dir)
}
