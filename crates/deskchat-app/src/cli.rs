use clap::{Parser, Subcommand};
use clap_complete::Shell;
use deskchat_types::FilterType;
use std::path::PathBuf;

/// CLI arguments for deskchat
#[derive(Parser, Debug)]
#[command(name = "deskchat")]
#[command(about = "Deskchat - customer service chat client with a persistent, searchable history")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Prediction backend base URL (e.g., http://localhost:8000)
    #[arg(long, value_name = "URL", env = "DESKCHAT_BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    /// Path of the history file (default: ~/.deskchat/chatHistory.json)
    #[arg(long, value_name = "PATH", env = "DESKCHAT_HISTORY_PATH", global = true)]
    pub history_path: Option<PathBuf>,

    /// Directory exports are written to (default: current directory)
    #[arg(long, value_name = "DIR", env = "DESKCHAT_EXPORT_DIR", global = true)]
    pub export_dir: Option<PathBuf>,

    /// Backend request timeout in seconds
    #[arg(long, value_name = "SECS", env = "DESKCHAT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Send order numbers found in messages along with the query
    #[arg(
        long,
        value_name = "BOOL",
        env = "DESKCHAT_EXTRACT_ORDER_NUMBERS",
        num_args = 0..=1,
        default_missing_value = "true",
        global = true
    )]
    pub extract_order_numbers: Option<bool>,

    /// Reload when another deskchat process changes the history file
    #[arg(
        long,
        value_name = "BOOL",
        env = "DESKCHAT_WATCH_HISTORY",
        num_args = 0..=1,
        default_missing_value = "true",
        global = true
    )]
    pub watch_history: Option<bool>,

    /// Path to a TOML config file (default: deskchat.toml in the working directory)
    #[arg(long, value_name = "PATH", env = "DESKCHAT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Write a JSONL log of the conversation into this directory
    #[arg(long, value_name = "DIR", env = "DESKCHAT_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Enable verbose debug output (shows HTTP requests, responses, headers, etc.)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Generate shell completions
    #[arg(long, value_enum)]
    pub generate: Option<Shell>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start an interactive chat session (default)
    Chat,
    /// Print the stored history, newest first
    History {
        /// Only show entries of this type (all, user, bot, system)
        #[arg(short = 'f', long, default_value = "all")]
        filter: FilterType,
        /// Only show entries whose message or intent contains this text
        #[arg(short = 's', long, default_value = "")]
        search: String,
    },
    /// Export the stored history as a JSON document
    Export {
        /// Output directory (overrides the configured export directory)
        #[arg(short = 'o', long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
    /// Erase the stored history
    Clear {
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// List the intents the backend knows
    Intents,
    /// List the categories the backend knows
    Categories,
    /// Show the response templates for one intent
    Templates {
        /// Intent label (e.g., order_status)
        intent: String,
    },
    /// Check that the backend is up and its model is loaded
    Health,
}
