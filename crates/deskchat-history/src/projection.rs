use deskchat_types::{FilterType, TranscriptEntry};

/// Filter + search state of a transcript pane
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptQuery {
    pub filter: FilterType,
    pub search: String,
}

impl TranscriptQuery {
    pub fn new(filter: FilterType, search: impl Into<String>) -> Self {
        Self {
            filter,
            search: search.into(),
        }
    }

    pub fn apply<'a>(&self, transcript: &'a [TranscriptEntry]) -> Vec<&'a TranscriptEntry> {
        project(transcript, self.filter, &self.search)
    }
}

/// Filtered, newest-first view of `transcript`.
///
/// An entry is kept when its type passes `filter` and, for a non-empty
/// `search`, its message or intent contains the search text ignoring case.
/// The sort is stable, so entries sharing a timestamp keep transcript order.
pub fn project<'a>(
    transcript: &'a [TranscriptEntry],
    filter: FilterType,
    search: &str,
) -> Vec<&'a TranscriptEntry> {
    let needle = search.to_lowercase();

    let mut view: Vec<&TranscriptEntry> = transcript
        .iter()
        .filter(|entry| filter.matches(entry.entry_type))
        .filter(|entry| needle.is_empty() || entry.contains_lowercase(&needle))
        .collect();

    view.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use deskchat_types::EntryType;
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn order_transcript() -> Vec<TranscriptEntry> {
        vec![
            TranscriptEntry::user("Where is my order?").at(t0()),
            TranscriptEntry::bot(
                "Your order ships tomorrow.",
                Some("order_status".into()),
                Some(0.92),
            )
            .at(t0() + Duration::seconds(1)),
        ]
    }

    fn messages(view: &[&TranscriptEntry]) -> Vec<String> {
        view.iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn all_with_empty_search_is_newest_first() {
        let transcript = order_transcript();
        let view = project(&transcript, FilterType::All, "");
        assert_eq!(
            messages(&view),
            vec!["Your order ships tomorrow.", "Where is my order?"]
        );
    }

    #[test]
    fn bot_filter_with_search_returns_the_bot_reply() {
        let transcript = order_transcript();
        let view = project(&transcript, FilterType::Bot, "order");
        assert_eq!(view.len(), 1);
        assert_eq!(view[0], &transcript[1]);
    }

    #[test]
    fn user_filter_keeps_only_user_entries() {
        let mut transcript = order_transcript();
        transcript.push(TranscriptEntry::user("Thanks").at(t0() + Duration::seconds(2)));
        transcript.push(TranscriptEntry::apology().at(t0() + Duration::seconds(3)));

        let view = project(&transcript, FilterType::User, "");
        assert!(view.iter().all(|e| e.entry_type == EntryType::User));
        assert_eq!(messages(&view), vec!["Thanks", "Where is my order?"]);
    }

    #[test]
    fn search_is_case_insensitive_and_matches_intent() {
        let transcript = order_transcript();

        let view = project(&transcript, FilterType::All, "SHIPS");
        assert_eq!(messages(&view), vec!["Your order ships tomorrow."]);

        let view = project(&transcript, FilterType::All, "Order_Status");
        assert_eq!(messages(&view), vec!["Your order ships tomorrow."]);
    }

    #[test]
    fn absent_intent_never_matches() {
        let transcript = vec![TranscriptEntry::user("hello").at(t0())];
        assert!(project(&transcript, FilterType::All, "status").is_empty());
    }

    #[test]
    fn ties_keep_transcript_order() {
        let transcript = vec![
            TranscriptEntry::user("first").at(t0()),
            TranscriptEntry::bot("second", None, None).at(t0()),
            TranscriptEntry::user("third").at(t0()),
            TranscriptEntry::user("newest").at(t0() + Duration::seconds(1)),
        ];
        let view = project(&transcript, FilterType::All, "");
        assert_eq!(messages(&view), vec!["newest", "first", "second", "third"]);

        // Pure: running it again yields the same order
        assert_eq!(view, project(&transcript, FilterType::All, ""));
    }

    #[test]
    fn projection_does_not_reorder_the_transcript() {
        let transcript = order_transcript();
        let before = transcript.clone();
        let _ = project(&transcript, FilterType::All, "");
        assert_eq!(transcript, before);
    }
}
