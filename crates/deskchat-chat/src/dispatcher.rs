use deskchat_api::BackendClient;
use deskchat_history::{HistoryError, HistoryStore};
use deskchat_logging::ConversationLogger;
use deskchat_types::{BackendQuery, BackendReply, EntryType, TranscriptEntry};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::order_number::extract_order_number;

/// Non-fatal problem the initiating view should show to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    fn persist_failed(entry_type: EntryType, error: &HistoryError) -> Self {
        Self {
            message: format!("Could not save {} message to history: {}", entry_type, error),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// One in-flight backend query. Dropping it detaches the request, which still
/// resolves and records its entry.
pub struct PendingRequest {
    handle: JoinHandle<Option<TranscriptEntry>>,
}

impl PendingRequest {
    /// Wait for the bot or system entry this request produced. `None` when the
    /// store was gone by the time the reply arrived.
    pub async fn resolved(self) -> Option<TranscriptEntry> {
        match self.handle.await {
            Ok(entry) => entry,
            Err(e) => {
                log::error!("pending request task failed: {}", e);
                None
            }
        }
    }
}

#[derive(Clone)]
struct Recorder {
    store: Weak<HistoryStore>,
    notices: Option<mpsc::UnboundedSender<Notice>>,
    logger: Option<Arc<Mutex<ConversationLogger>>>,
}

impl Recorder {
    /// Append to the store if it still exists. Persist failures become notices.
    async fn record(&self, entry: TranscriptEntry) -> Option<TranscriptEntry> {
        let Some(store) = self.store.upgrade() else {
            log::debug!("view torn down, dropping {} entry", entry.entry_type);
            return None;
        };

        let entry_type = entry.entry_type;
        match store.append(entry).await {
            Ok(stored) => {
                if let Some(logger) = &self.logger {
                    logger.lock().await.log_entry(&stored).await;
                }
                Some(stored)
            }
            Err(HistoryError::Closed) => {
                log::debug!("store closed, dropping {} entry", entry_type);
                None
            }
            Err(e) => {
                log::warn!("failed to persist {} entry: {}", entry_type, e);
                if let Some(notices) = &self.notices {
                    let _ = notices.send(Notice::persist_failed(entry_type, &e));
                }
                None
            }
        }
    }
}

/// Turns utterances into backend queries and their outcomes into transcript entries.
///
/// `submit` records the user entry before it returns and then leaves the
/// backend call running in the background, so several requests can be in
/// flight at once. Each one records exactly one bot or system entry when it
/// resolves, in completion order.
pub struct Dispatcher {
    backend: Arc<dyn BackendClient>,
    recorder: Recorder,
    tracker: TaskTracker,
    extract_order_numbers: bool,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn BackendClient>, store: &Arc<HistoryStore>) -> Self {
        Self {
            backend,
            recorder: Recorder {
                store: Arc::downgrade(store),
                notices: None,
                logger: None,
            },
            tracker: TaskTracker::new(),
            extract_order_numbers: false,
        }
    }

    /// Send persistence notices to `notices`
    pub fn with_notices(mut self, notices: mpsc::UnboundedSender<Notice>) -> Self {
        self.recorder.notices = Some(notices);
        self
    }

    /// Fill `order_number` from references found in the utterance
    pub fn with_order_number_extraction(mut self, enabled: bool) -> Self {
        self.extract_order_numbers = enabled;
        self
    }

    /// Mirror every recorded entry into a JSONL conversation log
    pub fn with_conversation_logger(mut self, logger: Arc<Mutex<ConversationLogger>>) -> Self {
        self.recorder.logger = Some(logger);
        self
    }

    /// Submit one utterance.
    ///
    /// Blank input is ignored and returns `None`. Otherwise the user entry is
    /// appended, one backend query is issued, and a handle to it is returned.
    pub async fn submit(&self, utterance: &str) -> Option<PendingRequest> {
        if utterance.trim().is_empty() {
            return None;
        }
        if self.recorder.store.strong_count() == 0 {
            log::debug!("view torn down, ignoring submission");
            return None;
        }

        self.recorder.record(TranscriptEntry::user(utterance)).await;

        let order_number = if self.extract_order_numbers {
            extract_order_number(utterance)
        } else {
            None
        };
        let query = BackendQuery::new(utterance).with_order_number(order_number);

        let backend = Arc::clone(&self.backend);
        let recorder = self.recorder.clone();
        let handle = self.tracker.spawn(async move {
            let entry = match backend.predict(&query).await {
                Ok(reply) => reply_entry(reply),
                Err(e) => {
                    log::warn!("backend call failed: {}", e);
                    TranscriptEntry::apology()
                }
            };
            recorder.record(entry).await
        });

        Some(PendingRequest { handle })
    }

    /// Number of requests still waiting on the backend
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every request submitted so far has resolved
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

/// Bot entry for a reply; a reply without text is treated as malformed.
/// Built at resolution time so the timestamp is the resolution instant.
fn reply_entry(reply: BackendReply) -> TranscriptEntry {
    if reply.response.trim().is_empty() {
        log::warn!("backend reply had an empty response");
        return TranscriptEntry::apology();
    }
    TranscriptEntry::from_reply(&reply)
}
