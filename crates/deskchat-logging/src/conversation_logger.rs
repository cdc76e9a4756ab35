use anyhow::Result;
use chrono::{DateTime, Local};
use deskchat_types::TranscriptEntry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

#[derive(Serialize)]
struct LogEntry<'a> {
    logged_at: String, // ISO‑8601 Local time
    #[serde(rename = "type")]
    entry_type: &'a str,
    message: &'a str,
    timestamp: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
}

/// Append-only JSONL log of every transcript entry a session produces
pub struct ConversationLogger {
    file_path: PathBuf,
    file: Option<tokio::fs::File>,
}

impl ConversationLogger {
    /// Create a new logger; generates the file name based on the current local time.
    pub async fn new(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir).await?;

        let filename = format!("deskchat-{}.jsonl", Local::now().format("%Y-%m-%d-%H%M%S"));
        let file_path = log_dir.join(filename);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await?;
        Ok(Self { file_path, file: Some(file) })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Append a single log line. Write failures are reported and logging continues.
    pub async fn log_entry(&mut self, entry: &TranscriptEntry) {
        let line = LogEntry {
            logged_at: Local::now().to_rfc3339(),
            entry_type: entry.entry_type.as_str(),
            message: &entry.message,
            timestamp: entry.timestamp.with_timezone(&Local),
            intent: entry.intent.as_deref(),
            confidence: entry.confidence,
        };

        if let Some(file) = &mut self.file {
            if let Ok(json) = serde_json::to_string(&line) {
                if let Err(e) = file.write_all(json.as_bytes()).await {
                    log::warn!("conversation log write failed: {}", e);
                } else if let Err(e) = file.write_all(b"\n").await {
                    log::warn!("conversation log write failed: {}", e);
                } else {
                    let _ = file.flush().await;
                }
            }
        }
    }

    /// Close the log file, flushing buffered data
    pub async fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_one_json_line_per_entry() {
        let dir = TempDir::new().unwrap();
        let mut logger = ConversationLogger::new(dir.path()).await.unwrap();

        logger.log_entry(&TranscriptEntry::user("Where is my order?")).await;
        logger
            .log_entry(&TranscriptEntry::bot(
                "Your order ships tomorrow.",
                Some("order_status".into()),
                Some(0.92),
            ))
            .await;
        logger.close().await;

        let content = std::fs::read_to_string(logger.file_path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "user");
        assert!(lines[0].get("intent").is_none());
        assert_eq!(lines[1]["intent"], "order_status");
        assert_eq!(lines[1]["confidence"], 0.92);
    }
}
