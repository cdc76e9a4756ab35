use anyhow::{Context, Result};
use deskchat_types::{
    TranscriptEntry, DEFAULT_BACKEND_URL, DEFAULT_DISPLAY_NAME, DEFAULT_GREETING, HISTORY_SLOT,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;

/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "deskchat.toml";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default accent colour of bot messages
pub const DEFAULT_BOT_COLOR: &str = "#376B7E";

/// Contents of `deskchat.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub backend_url: Option<String>,
    pub history_path: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub extract_order_numbers: Option<bool>,
    pub watch_history: Option<bool>,
    pub log_dir: Option<PathBuf>,
    pub view: FileViewConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileViewConfig {
    pub display_name: Option<String>,
    pub greeting: Option<String>,
    pub bot_color: Option<String>,
}

impl FileConfig {
    /// Parse a config file. A missing file yields the empty config.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config file: {}", path.display()))
            }
        };
        toml::from_str(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }
}

/// Resolved client settings
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub backend_url: String,
    pub history_path: PathBuf,
    pub export_dir: PathBuf,
    pub request_timeout: Duration,
    pub extract_order_numbers: bool,
    pub watch_history: bool,
    pub log_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl ClientConfig {
    /// Precedence: CLI flag > DESKCHAT_* env (both carried by `cli`) > config file > defaults
    pub fn resolve(cli: &Cli, file: &FileConfig) -> Self {
        let history_path = cli
            .history_path
            .clone()
            .or_else(|| file.history_path.clone())
            .unwrap_or_else(default_history_path);

        let request_timeout = cli
            .timeout
            .filter(|secs| *secs > 0)
            .or(file.request_timeout_secs.filter(|secs| *secs > 0))
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Self {
            backend_url: cli
                .backend_url
                .clone()
                .or_else(|| file.backend_url.clone())
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            history_path,
            export_dir: cli
                .export_dir
                .clone()
                .or_else(|| file.export_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            request_timeout,
            extract_order_numbers: cli
                .extract_order_numbers
                .or(file.extract_order_numbers)
                .unwrap_or(false),
            watch_history: cli.watch_history.or(file.watch_history).unwrap_or(true),
            log_dir: cli.log_dir.clone().or_else(|| file.log_dir.clone()),
            verbose: cli.verbose,
        }
    }
}

/// `~/.deskchat/chatHistory.json`, or the working directory when there is no home
pub fn default_history_path() -> PathBuf {
    let file_name = format!("{}.json", HISTORY_SLOT);
    match deskchat_logging::get_deskchat_dir() {
        Ok(dir) => dir.join(file_name),
        Err(e) => {
            log::warn!("{}; keeping history in the working directory", e);
            PathBuf::from(file_name)
        }
    }
}

/// Terminal colours of the transcript view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewStyle {
    pub bot_color: (u8, u8, u8),
}

impl Default for ViewStyle {
    fn default() -> Self {
        Self {
            bot_color: (0x37, 0x6B, 0x7E),
        }
    }
}

/// Presentation settings for the view layer. Nothing in the message
/// pipeline reads them.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    /// Shown at the top of a fresh live pane; never persisted
    pub initial_entries: Vec<TranscriptEntry>,
    pub display_name: String,
    pub style: ViewStyle,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            initial_entries: vec![TranscriptEntry::bot(DEFAULT_GREETING, None, None)],
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            style: ViewStyle::default(),
        }
    }
}

impl ViewConfig {
    pub fn from_file(file: &FileViewConfig) -> Self {
        let mut config = Self::default();
        if let Some(name) = file.display_name.as_ref().filter(|n| !n.trim().is_empty()) {
            config.display_name = name.clone();
        }
        if let Some(greeting) = &file.greeting {
            config.initial_entries = if greeting.trim().is_empty() {
                Vec::new()
            } else {
                vec![TranscriptEntry::bot(greeting.clone(), None, None)]
            };
        }
        if let Some(color) = &file.bot_color {
            match parse_hex_color(color) {
                Some(rgb) => config.style.bot_color = rgb,
                None => log::warn!("ignoring invalid bot_color {:?}, using {}", color, DEFAULT_BOT_COLOR),
            }
        }
        config
    }
}

/// Parse `#RRGGBB` (the `#` is optional)
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
