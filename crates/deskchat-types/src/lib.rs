//! Core types and structures for deskchat
//!
//! This crate provides the transcript entry model and the backend wire types
//! shared by every other deskchat crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Name of the persisted history slot
pub const HISTORY_SLOT: &str = "chatHistory";

/// Message recorded when a backend call fails for any reason
pub const APOLOGY_MESSAGE: &str = "I'm sorry, I encountered an error. Please try again.";

/// Default prediction backend
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Default greeting shown in a fresh live pane
pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

/// Default name the bot is displayed under
pub const DEFAULT_DISPLAY_NAME: &str = "Customer Service Bot";

// ============================================================================
// Entry Types
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseKindError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    User,
    Bot,
    System,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::User => "user",
            EntryType::Bot => "bot",
            EntryType::System => "system",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(EntryType::User),
            "bot" => Ok(EntryType::Bot),
            "system" => Ok(EntryType::System),
            _ => Err(ParseKindError {
                kind: "entry type",
                value: s.to_string(),
                expected: "user, bot, system",
            }),
        }
    }
}

/// Type filter applied by a transcript projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    #[default]
    All,
    User,
    Bot,
    System,
}

impl FilterType {
    /// Every filter, in the order a filter bar presents them
    pub const ALL_FILTERS: [FilterType; 4] = [
        FilterType::All,
        FilterType::User,
        FilterType::Bot,
        FilterType::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::All => "all",
            FilterType::User => "user",
            FilterType::Bot => "bot",
            FilterType::System => "system",
        }
    }

    /// Whether an entry of the given type passes this filter
    pub fn matches(&self, entry_type: EntryType) -> bool {
        match self {
            FilterType::All => true,
            FilterType::User => entry_type == EntryType::User,
            FilterType::Bot => entry_type == EntryType::Bot,
            FilterType::System => entry_type == EntryType::System,
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(FilterType::All),
            "user" => Ok(FilterType::User),
            "bot" => Ok(FilterType::Bot),
            "system" => Ok(FilterType::System),
            _ => Err(ParseKindError {
                kind: "filter",
                value: s.to_string(),
                expected: "all, user, bot, system",
            }),
        }
    }
}

// ============================================================================
// Transcript Entry
// ============================================================================

/// One user, bot, or system message in the transcript.
///
/// Entries are never mutated after they are appended; the history store only
/// hands out clones or shared references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence: Option<f64>,
}

impl TranscriptEntry {
    fn new(entry_type: EntryType, message: impl Into<String>) -> Self {
        Self {
            entry_type,
            message: message.into(),
            timestamp: Utc::now(),
            intent: None,
            confidence: None,
        }
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::new(EntryType::User, message)
    }

    /// Bot entry; intent and confidence are kept together (see `classified`)
    pub fn bot(message: impl Into<String>, intent: Option<String>, confidence: Option<f64>) -> Self {
        Self::new(EntryType::Bot, message).classified(intent, confidence)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(EntryType::System, message)
    }

    /// The entry recorded for a failed backend call
    pub fn apology() -> Self {
        Self::system(APOLOGY_MESSAGE)
    }

    /// Build a bot entry from a prediction reply
    pub fn from_reply(reply: &BackendReply) -> Self {
        Self::bot(reply.response.clone(), reply.intent.clone(), reply.confidence)
    }

    /// Replace the creation instant
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach a classification. A confidence without an intent is dropped, an
    /// intent without a confidence gets 0.0, and confidence is clamped to [0, 1].
    pub fn classified(mut self, intent: Option<String>, confidence: Option<f64>) -> Self {
        match intent.filter(|i| !i.trim().is_empty()) {
            Some(intent) => {
                let confidence = confidence
                    .filter(|c| c.is_finite())
                    .unwrap_or(0.0)
                    .clamp(0.0, 1.0);
                self.intent = Some(intent);
                self.confidence = Some(confidence);
            }
            None => {
                self.intent = None;
                self.confidence = None;
            }
        }
        self
    }

    /// Case-insensitive substring match against the message or the intent.
    /// `needle` must already be lowercased.
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        self.message.to_lowercase().contains(needle)
            || self
                .intent
                .as_ref()
                .map(|intent| intent.to_lowercase().contains(needle))
                .unwrap_or(false)
    }
}

// ============================================================================
// Backend Wire Types
// ============================================================================

/// Body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendQuery {
    pub query: String,
    pub order_number: Option<String>,
}

impl BackendQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            order_number: None,
        }
    }

    pub fn with_order_number(mut self, order_number: Option<String>) -> Self {
        self.order_number = order_number;
        self
    }
}

/// Reply of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendReply {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub template_flags: Option<String>,
}

/// One row of `GET /templates/{intent}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTemplate {
    pub flags: String,
    pub instruction: String,
    pub category: String,
    pub intent: String,
    pub response: String,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub templates_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entry_serializes_with_type_field_and_iso_timestamp() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let entry = TranscriptEntry::user("Where is my order?").at(ts);

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "user",
                "message": "Where is my order?",
                "timestamp": "2024-05-01T10:00:00Z"
            })
        );
    }

    #[test]
    fn entry_parses_browser_style_timestamps() {
        let json = r#"{"type":"bot","message":"Ships tomorrow","timestamp":"2024-05-01T10:00:00.123Z","intent":"order_status","confidence":0.92}"#;
        let entry: TranscriptEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.entry_type, EntryType::Bot);
        assert_eq!(entry.intent.as_deref(), Some("order_status"));
        assert_eq!(entry.confidence, Some(0.92));
    }

    #[test]
    fn classification_keeps_intent_and_confidence_paired() {
        let entry = TranscriptEntry::bot("hi", None, Some(0.5));
        assert_eq!(entry.intent, None);
        assert_eq!(entry.confidence, None);

        let entry = TranscriptEntry::bot("hi", Some("greeting".into()), None);
        assert_eq!(entry.confidence, Some(0.0));

        let entry = TranscriptEntry::bot("hi", Some("greeting".into()), Some(1.7));
        assert_eq!(entry.confidence, Some(1.0));
    }

    #[test]
    fn apology_is_a_system_entry() {
        let entry = TranscriptEntry::apology();
        assert_eq!(entry.entry_type, EntryType::System);
        assert_eq!(entry.message, APOLOGY_MESSAGE);
    }

    #[test]
    fn filter_parsing_and_matching() {
        assert_eq!("BOT".parse::<FilterType>().unwrap(), FilterType::Bot);
        assert!("robots".parse::<FilterType>().is_err());
        assert!(FilterType::All.matches(EntryType::System));
        assert!(FilterType::User.matches(EntryType::User));
        assert!(!FilterType::User.matches(EntryType::Bot));
    }

    #[test]
    fn query_always_serializes_order_number() {
        let body = serde_json::to_value(BackendQuery::new("Hi")).unwrap();
        assert_eq!(body, serde_json::json!({ "query": "Hi", "order_number": null }));
    }

    #[test]
    fn reply_tolerates_missing_optional_fields() {
        let reply: BackendReply = serde_json::from_str(r#"{"response":"ok"}"#).unwrap();
        assert_eq!(reply.intent, None);
        let entry = TranscriptEntry::from_reply(&reply);
        assert_eq!(entry.entry_type, EntryType::Bot);
        assert_eq!(entry.message, "ok");
    }
}
