pub mod commands;
pub mod repl;
pub mod setup;

pub use commands::{clear_history, export_history, history_listing};
pub use repl::{parse_repl_line, run_repl_mode, ReplCommand};
pub use setup::{setup_from_cli, AppConfig};
