//! Deskchat application library
//!
//! CLI definition, configuration resolution, the console transcript view and
//! the interactive session built on the deskchat crates.

pub use deskchat_api as api;
pub use deskchat_chat as chat;
pub use deskchat_history as history;
pub use deskchat_types as types;

pub mod app;
pub mod cli;
pub mod config;
pub mod view;

pub use app::{run_repl_mode, setup_from_cli, AppConfig};
pub use cli::{Cli, Commands};
pub use config::{ClientConfig, FileConfig, ViewConfig, ViewStyle};
pub use view::TranscriptView;
