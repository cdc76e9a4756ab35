use chrono::Local;
use colored::{ColoredString, Colorize};
use deskchat_history::TranscriptQuery;
use deskchat_types::{EntryType, FilterType, TranscriptEntry};

use crate::config::ViewConfig;

pub const EMPTY_STATE_MESSAGE: &str = "No messages found matching your search criteria";

/// `0.92` -> `92.0%`
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

/// Console rendering of transcript entries and projections
pub struct TranscriptView {
    config: ViewConfig,
    query: TranscriptQuery,
}

impl TranscriptView {
    pub fn new(config: ViewConfig) -> Self {
        Self {
            config,
            query: TranscriptQuery::default(),
        }
    }

    pub fn query(&self) -> &TranscriptQuery {
        &self.query
    }

    pub fn set_filter(&mut self, filter: FilterType) {
        self.query.filter = filter;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.query.search = search.into();
    }

    /// Lines for the top of a fresh live pane
    pub fn greeting(&self) -> Vec<String> {
        self.config
            .initial_entries
            .iter()
            .map(|entry| self.render_entry(entry))
            .collect()
    }

    /// One entry, plus an intent line for classified bot replies
    pub fn render_entry(&self, entry: &TranscriptEntry) -> String {
        let time = entry
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        let mut line = format!(
            "{} {} {}",
            format!("[{}]", time).bright_black(),
            self.speaker(entry.entry_type),
            entry.message
        );

        if let (Some(intent), Some(confidence)) = (&entry.intent, entry.confidence) {
            let detail = format!("Intent: {} (Confidence: {})", intent, format_confidence(confidence));
            line.push_str(&format!("\n    {}", detail.bright_black()));
        }
        line
    }

    /// The projection under the view's current filter and search
    pub fn render(&self, transcript: &[TranscriptEntry]) -> Vec<String> {
        self.render_query(transcript, &self.query)
    }

    /// The projection under `query`, newest first.
    ///
    /// An empty transcript renders nothing; a transcript the query hides
    /// entirely renders the empty-state line.
    pub fn render_query(&self, transcript: &[TranscriptEntry], query: &TranscriptQuery) -> Vec<String> {
        if transcript.is_empty() {
            return Vec::new();
        }

        let view = query.apply(transcript);
        if view.is_empty() {
            return vec![EMPTY_STATE_MESSAGE.bright_black().to_string()];
        }
        view.into_iter().map(|entry| self.render_entry(entry)).collect()
    }

    /// One-line description of the active filter, e.g. `filter: bot, search: "order"`
    pub fn describe_query(&self) -> String {
        if self.query.search.is_empty() {
            format!("filter: {}", self.query.filter)
        } else {
            format!("filter: {}, search: {:?}", self.query.filter, self.query.search)
        }
    }

    fn speaker(&self, entry_type: EntryType) -> ColoredString {
        match entry_type {
            EntryType::User => "You:".bright_green().bold(),
            EntryType::Bot => {
                let (r, g, b) = self.config.style.bot_color;
                format!("{}:", self.config.display_name).truecolor(r, g, b).bold()
            }
            EntryType::System => "System:".bright_yellow().bold(),
        }
    }
}
