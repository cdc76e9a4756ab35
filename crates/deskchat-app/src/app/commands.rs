use anyhow::{Context, Result};
use deskchat_api::BackendClient;
use deskchat_history::{HistoryStore, TranscriptQuery};
use std::io::{BufRead, Write};
use std::path::Path;

use crate::cli::Commands;
use crate::view::TranscriptView;

use super::setup::AppConfig;

pub const CLEAR_PROMPT: &str = "Are you sure you want to clear all chat history?";

impl Commands {
    /// Run a one-shot subcommand and return the text to print
    pub async fn execute(&self, app: &AppConfig) -> Result<String> {
        match self {
            Commands::Chat => anyhow::bail!("chat is interactive and has no one-shot form"),
            Commands::History { filter, search } => {
                let store = app.open_history(None).await?;
                let view = TranscriptView::new(app.view_config.clone());
                Ok(history_listing(&store, &view, &TranscriptQuery::new(*filter, search.clone())).await)
            }
            Commands::Export { out } => {
                let store = app.open_history(None).await?;
                let dir = out.as_ref().unwrap_or(&app.client_config.export_dir);
                export_history(&store, dir).await
            }
            Commands::Clear { yes } => {
                let store = app.open_history(None).await?;
                clear_history(&store, *yes, confirm_on_stdin).await
            }
            Commands::Intents => list_intents(&app.backend()?).await,
            Commands::Categories => list_categories(&app.backend()?).await,
            Commands::Templates { intent } => list_templates(&app.backend()?, intent).await,
            Commands::Health => health_report(&app.backend()?).await,
        }
    }
}

/// The stored history under `query`, one rendered entry per line
pub async fn history_listing(store: &HistoryStore, view: &TranscriptView, query: &TranscriptQuery) -> String {
    let transcript = store.load().await;
    if transcript.is_empty() {
        return "History is empty".to_string();
    }
    view.render_query(&transcript, query).join("\n")
}

pub async fn export_history(store: &HistoryStore, dir: &Path) -> Result<String> {
    let count = store.load().await.len();
    let file = store
        .export_to_dir(dir)
        .await
        .with_context(|| format!("Failed to export history to {}", dir.display()))?;
    Ok(format!("Exported {} entries to {}", count, file.display()))
}

/// Clear the history after `confirm` agrees, unless `yes` skips the question
pub async fn clear_history<F>(store: &HistoryStore, yes: bool, confirm: F) -> Result<String>
where
    F: FnOnce(&str) -> Result<bool>,
{
    if !yes && !confirm(CLEAR_PROMPT)? {
        return Ok("Clear cancelled".to_string());
    }
    store.clear().await.context("Failed to clear history")?;
    Ok("Chat history cleared".to_string())
}

/// Ask a yes/no question on the terminal; anything but y/yes is a no
pub fn confirm_on_stdin(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub async fn list_intents(backend: &dyn BackendClient) -> Result<String> {
    let intents = backend.intents().await.context("Failed to fetch intents")?;
    Ok(bullet_list("intents", &intents))
}

pub async fn list_categories(backend: &dyn BackendClient) -> Result<String> {
    let categories = backend.categories().await.context("Failed to fetch categories")?;
    Ok(bullet_list("categories", &categories))
}

pub async fn list_templates(backend: &dyn BackendClient, intent: &str) -> Result<String> {
    let templates = backend
        .templates(intent)
        .await
        .with_context(|| format!("Failed to fetch templates for {}", intent))?;
    if templates.is_empty() {
        return Ok(format!("No templates for intent '{}'", intent));
    }

    let mut out = format!("{} templates for '{}':", templates.len(), intent);
    for template in &templates {
        out.push_str(&format!(
            "\n- [{}] {} ({})\n  {}",
            template.category, template.instruction, template.flags, template.response
        ));
    }
    Ok(out)
}

pub async fn health_report(backend: &dyn BackendClient) -> Result<String> {
    let health = backend.health().await.context("Backend health check failed")?;
    Ok(format!(
        "status: {}, model loaded: {}, templates: {}",
        health.status,
        if health.model_loaded { "yes" } else { "no" },
        health.templates_count
    ))
}

fn bullet_list(what: &str, items: &[String]) -> String {
    if items.is_empty() {
        return format!("No {} available", what);
    }
    let mut out = format!("{} {}:", items.len(), what);
    for item in items {
        out.push_str("\n- ");
        out.push_str(item);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use deskchat_api::HttpBackendClient;
    use deskchat_history::read_export;
    use deskchat_types::{FilterType, TranscriptEntry};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn seeded_store(dir: &TempDir) -> HistoryStore {
        let store = HistoryStore::open(dir.path().join("chatHistory.json")).await.unwrap();
        store.append(TranscriptEntry::user("Where is my order?")).await.unwrap();
        store
            .append(TranscriptEntry::bot("Your order ships tomorrow.", Some("order_status".into()), Some(0.92)))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn listing_applies_the_query() {
        colored::control::set_override(false);
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;
        let view = TranscriptView::new(ViewConfig::default());

        let listing = history_listing(&store, &view, &TranscriptQuery::new(FilterType::Bot, "order")).await;
        assert!(listing.contains("Your order ships tomorrow."));
        assert!(!listing.contains("Where is my order?"));

        let empty = HistoryStore::open(dir.path().join("other.json")).await.unwrap();
        assert_eq!(history_listing(&empty, &view, &TranscriptQuery::default()).await, "History is empty");
    }

    #[tokio::test]
    async fn export_writes_a_readable_document() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;
        let out = dir.path().join("exports");

        let message = export_history(&store, &out).await.unwrap();
        assert!(message.starts_with("Exported 2 entries to "));

        let file = std::fs::read_dir(&out).unwrap().next().unwrap().unwrap().path();
        let entries = read_export(&std::fs::read(file).unwrap()).unwrap();
        assert_eq!(entries, store.load().await);
    }

    #[tokio::test]
    async fn clear_asks_first_unless_told_not_to() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir).await;

        let mut asked = None;
        let message = clear_history(&store, false, |prompt| {
            asked = Some(prompt.to_string());
            Ok(false)
        })
        .await
        .unwrap();
        assert_eq!(message, "Clear cancelled");
        assert_eq!(asked.as_deref(), Some(CLEAR_PROMPT));
        assert_eq!(store.load().await.len(), 2);

        let message = clear_history(&store, true, |_| panic!("must not ask")).await.unwrap();
        assert_eq!(message, "Chat history cleared");
        assert!(store.load().await.is_empty());
    }

    #[test]
    fn yes_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }

    #[tokio::test]
    async fn catalogue_commands_format_backend_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/intents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["order_status", "refund"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "healthy",
                "model_loaded": true,
                "templates_count": 42
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/templates/refund"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "flags": "B",
                "instruction": "I want my money back",
                "category": "REFUND",
                "intent": "refund",
                "response": "I can help with that refund."
            }])))
            .mount(&server)
            .await;

        let backend = HttpBackendClient::new(&server.uri(), Duration::from_secs(2)).unwrap();

        assert_eq!(list_intents(&backend).await.unwrap(), "2 intents:\n- order_status\n- refund");
        assert_eq!(list_categories(&backend).await.unwrap(), "No categories available");
        assert_eq!(
            health_report(&backend).await.unwrap(),
            "status: healthy, model loaded: yes, templates: 42"
        );

        let templates = list_templates(&backend, "refund").await.unwrap();
        assert!(templates.starts_with("1 templates for 'refund':"));
        assert!(templates.contains("I can help with that refund."));

        // 404 from the backend means no templates
        assert_eq!(
            list_templates(&backend, "unknown").await.unwrap(),
            "No templates for intent 'unknown'"
        );
    }
}
