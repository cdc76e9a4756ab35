use anyhow::Result;
use colored::Colorize;
use deskchat_api::BackendClient;
use deskchat_chat::Dispatcher;
use deskchat_history::{ChangeKind, StorageWatcher, SyncBridge, TranscriptQuery};
use deskchat_logging::ConversationLogger;
use deskchat_types::FilterType;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::view::TranscriptView;

use super::commands::{clear_history, export_history, history_listing, is_yes};
use super::setup::AppConfig;

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Submit(String),
    /// `/history [filter] [search]`; absent parts fall back to the pane's query
    History {
        filter: Option<FilterType>,
        search: Option<String>,
    },
    Filter(FilterType),
    Search(String),
    Export,
    Clear,
    Help,
    Exit,
    Invalid(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_repl_line(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line == "exit" || line == "quit" {
        return Some(ReplCommand::Exit);
    }
    if !line.starts_with('/') {
        return Some(ReplCommand::Submit(line.to_string()));
    }

    let (name, args) = match line.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (line, ""),
    };

    let command = match name {
        "/history" => {
            let (first, rest) = match args.split_once(char::is_whitespace) {
                Some((first, rest)) => (first, rest.trim()),
                None => (args, ""),
            };
            match FilterType::from_str(first) {
                Ok(filter) => ReplCommand::History {
                    filter: Some(filter),
                    search: Some(rest.to_string()).filter(|s| !s.is_empty()),
                },
                Err(_) => ReplCommand::History {
                    filter: None,
                    search: Some(args.to_string()).filter(|s| !s.is_empty()),
                },
            }
        }
        "/filter" => match FilterType::from_str(args) {
            Ok(filter) => ReplCommand::Filter(filter),
            Err(_) => ReplCommand::Invalid(format!("Usage: /filter {}", filter_choices())),
        },
        "/search" => ReplCommand::Search(args.to_string()),
        "/export" => ReplCommand::Export,
        "/clear" => ReplCommand::Clear,
        "/help" => ReplCommand::Help,
        other => ReplCommand::Invalid(format!("Unknown command: {}. Type /help for commands", other)),
    };
    Some(command)
}

/// Console line announcing a change made by another window or process
pub fn sync_message(kind: &ChangeKind, entries: usize) -> String {
    match kind {
        ChangeKind::Cleared => "History was cleared elsewhere".to_string(),
        _ => format!("History updated elsewhere ({} entries)", entries),
    }
}

/// `all|user|bot|system`
fn filter_choices() -> String {
    FilterType::ALL_FILTERS
        .iter()
        .map(FilterType::as_str)
        .collect::<Vec<_>>()
        .join("|")
}

fn print_help() {
    println!("{} Commands:", "💡".bright_yellow());
    println!("  /history [filter] [search] - Show stored history, newest first");
    println!("  /filter <all|user|bot|system> - Set the history filter");
    println!("  /search <text>             - Set the history search (empty clears it)");
    println!("  /export                    - Export history as JSON");
    println!("  /clear                     - Erase all history (asks first)");
    println!("  /help                      - Show this help");
    println!("  exit                       - Leave the chat");
}

/// Run interactive REPL mode
pub async fn run_repl_mode(app: AppConfig) -> Result<()> {
    let config = &app.client_config;

    println!("{}", format!("💬 {}", app.view_config.display_name).bright_cyan().bold());
    println!("{}", format!("Backend: {}", config.backend_url).bright_black());
    println!("{}", format!("History: {}", config.history_path.display()).bright_black());
    println!("{}", "Type 'exit' to leave, or '/help' to see commands\n".bright_black());

    let bridge = SyncBridge::new();
    let store = Arc::new(app.open_history(Some(bridge.clone())).await?);

    let _watcher = if config.watch_history {
        match StorageWatcher::spawn(store.path(), bridge.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                eprintln!("{} Not watching history for outside changes: {}", "⚠️".yellow(), e);
                None
            }
        }
    } else {
        None
    };

    let backend: Arc<dyn BackendClient> = Arc::new(app.backend()?);
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    let mut dispatcher = Dispatcher::new(backend, &store)
        .with_notices(notice_tx)
        .with_order_number_extraction(config.extract_order_numbers);

    let logger = match &config.log_dir {
        Some(dir) => match ConversationLogger::new(dir).await {
            Ok(logger) => {
                println!("{}", format!("Logging conversation to {}", logger.file_path().display()).bright_black());
                Some(Arc::new(Mutex::new(logger)))
            }
            Err(e) => {
                eprintln!("Logging disabled: {}", e);
                None
            }
        },
        None => None,
    };
    if let Some(logger) = &logger {
        dispatcher = dispatcher.with_conversation_logger(Arc::clone(logger));
    }

    tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            eprintln!("{} {}", "⚠️".yellow(), notice);
        }
    });

    let mut subscription = bridge.subscribe(store.context_id());
    let watched = Arc::downgrade(&store);
    tokio::spawn(async move {
        while let Some(change) = subscription.next().await {
            let Some(store) = watched.upgrade() else { break };
            if let Some(entries) = store.refresh().await {
                log::info!("history changed by {}", change.origin);
                println!("\n{}", sync_message(&change.kind, entries.len()).bright_blue());
            }
        }
    });

    let renderer = Arc::new(TranscriptView::new(app.view_config.clone()));
    let mut view = TranscriptView::new(app.view_config.clone());
    for line in view.greeting() {
        println!("{}", line);
    }

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline(&format!("{} ", "You:".bright_green().bold())) {
            Ok(line) => {
                let Some(command) = parse_repl_line(&line) else {
                    continue;
                };

                match command {
                    ReplCommand::Exit => {
                        println!("{}", "Goodbye!".bright_cyan());
                        break;
                    }
                    ReplCommand::Submit(text) => {
                        rl.add_history_entry(text.as_str())?;
                        if let Some(pending) = dispatcher.submit(&text).await {
                            let renderer = Arc::clone(&renderer);
                            tokio::spawn(async move {
                                if let Some(entry) = pending.resolved().await {
                                    println!("{}", renderer.render_entry(&entry));
                                }
                            });
                        }
                    }
                    ReplCommand::History { filter, search } => {
                        let query = TranscriptQuery::new(
                            filter.unwrap_or(view.query().filter),
                            search.unwrap_or_else(|| view.query().search.clone()),
                        );
                        println!("{}", history_listing(&store, &view, &query).await);
                    }
                    ReplCommand::Filter(filter) => {
                        view.set_filter(filter);
                        println!("{} {}", "🔎".bright_cyan(), view.describe_query());
                    }
                    ReplCommand::Search(search) => {
                        view.set_search(search);
                        println!("{} {}", "🔎".bright_cyan(), view.describe_query());
                    }
                    ReplCommand::Export => match export_history(&store, &config.export_dir).await {
                        Ok(msg) => println!("{} {}", "💾".bright_green(), msg),
                        Err(e) => eprintln!("{} {:#}", "❌".bright_red(), e),
                    },
                    ReplCommand::Clear => {
                        let result = clear_history(&store, false, |prompt| {
                            Ok(is_yes(&rl.readline(&format!("{} [y/N] ", prompt))?))
                        })
                        .await;
                        match result {
                            Ok(msg) => println!("{} {}", "🗑️".bright_green(), msg),
                            Err(e) => eprintln!("{} {:#}", "❌".bright_red(), e),
                        }
                    }
                    ReplCommand::Help => print_help(),
                    ReplCommand::Invalid(msg) => eprintln!("{} {}", "❌".bright_red(), msg),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".bright_black());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".bright_cyan());
                break;
            }
            Err(err) => {
                eprintln!("{} {}", "Error:".bright_red().bold(), err);
                break;
            }
        }
    }

    if dispatcher.in_flight() > 0 {
        log::info!("leaving with {} requests still pending", dispatcher.in_flight());
    }
    store.close();
    if let Some(logger) = &logger {
        logger.lock().await.close().await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_text_is_submitted_and_blank_is_ignored() {
        assert_eq!(parse_repl_line("   "), None);
        assert_eq!(
            parse_repl_line("  Where is my order?  "),
            Some(ReplCommand::Submit("Where is my order?".to_string()))
        );
        assert_eq!(parse_repl_line("quit"), Some(ReplCommand::Exit));
    }

    #[test]
    fn history_takes_an_optional_filter_then_search() {
        assert_eq!(
            parse_repl_line("/history"),
            Some(ReplCommand::History { filter: None, search: None })
        );
        assert_eq!(
            parse_repl_line("/history bot order status"),
            Some(ReplCommand::History {
                filter: Some(FilterType::Bot),
                search: Some("order status".to_string()),
            })
        );
        assert_eq!(
            parse_repl_line("/history refund"),
            Some(ReplCommand::History {
                filter: None,
                search: Some("refund".to_string()),
            })
        );
    }

    #[test]
    fn filter_and_search_commands() {
        assert_eq!(parse_repl_line("/filter SYSTEM"), Some(ReplCommand::Filter(FilterType::System)));
        assert_eq!(
            parse_repl_line("/filter robots"),
            Some(ReplCommand::Invalid("Usage: /filter all|user|bot|system".to_string()))
        );
        assert_eq!(parse_repl_line("/search"), Some(ReplCommand::Search(String::new())));
        assert_eq!(parse_repl_line("/search  Order "), Some(ReplCommand::Search("Order".to_string())));
    }

    #[test]
    fn unknown_slash_command_is_reported() {
        match parse_repl_line("/frobnicate now") {
            Some(ReplCommand::Invalid(msg)) => assert!(msg.contains("/frobnicate")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn sync_messages() {
        assert_eq!(sync_message(&ChangeKind::Cleared, 0), "History was cleared elsewhere");
        assert_eq!(sync_message(&ChangeKind::Changed, 3), "History updated elsewhere (3 entries)");
    }
}
