use deskchat_types::TranscriptEntry;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

const BRIDGE_CAPACITY: usize = 256;
const WATCH_DEBOUNCE: Duration = Duration::from_millis(75);

/// Identity of one execution context (one open view of a history slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Origin used for changes detected on disk, made by some other process
    pub const EXTERNAL: ContextId = ContextId(Uuid::nil());

    pub fn new() -> Self {
        ContextId(Uuid::new_v4())
    }

    pub fn is_external(&self) -> bool {
        *self == Self::EXTERNAL
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_external() {
            f.write_str("external")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    Appended(TranscriptEntry),
    Cleared,
    /// The slot changed in an unknown way; reload it
    Changed,
    /// Notifications were missed; reload it
    Resync,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryChange {
    pub origin: ContextId,
    pub kind: ChangeKind,
}

/// Publish/subscribe bus every context of one history slot shares.
///
/// Delivery is best effort: a subscriber that falls behind gets a `Resync`
/// and recovers by reloading the slot.
#[derive(Clone)]
pub struct SyncBridge {
    sender: broadcast::Sender<HistoryChange>,
}

impl SyncBridge {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BRIDGE_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, origin: ContextId, kind: ChangeKind) {
        // No subscribers is not an error
        let _ = self.sender.send(HistoryChange { origin, kind });
    }

    /// Subscribe on behalf of `context`; its own changes are filtered out
    pub fn subscribe(&self, context: ContextId) -> SyncSubscription {
        SyncSubscription {
            context,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for SyncBridge {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SyncSubscription {
    context: ContextId,
    receiver: broadcast::Receiver<HistoryChange>,
}

impl SyncSubscription {
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// Wait for the next change made by some other context.
    /// Returns `None` once every bridge handle is gone.
    pub async fn next(&mut self) -> Option<HistoryChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.origin == self.context => continue,
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("context {} missed {} history notifications", self.context, skipped);
                    return Some(HistoryChange {
                        origin: ContextId::EXTERNAL,
                        kind: ChangeKind::Resync,
                    });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Watches a history slot on disk and publishes `Changed` for every write,
/// including writes by other processes sharing the slot.
///
/// Subscribers react with `HistoryStore::refresh`, which ignores writes the
/// subscribing store made itself.
pub struct StorageWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl StorageWatcher {
    pub fn spawn(path: &Path, bridge: SyncBridge) -> notify::Result<Self> {
        let slot = path.to_path_buf();
        let file_name = slot.file_name().map(|n| n.to_os_string());
        let watch_dir = match slot.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => log::warn!("history watch error: {}", e),
        })?;
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
        log::info!("watching {} for history changes", slot.display());

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if !touches_slot(&event, file_name.as_deref()) {
                    continue;
                }
                // Coalesce bursts (temp file rename, remove + create) into one notification
                tokio::time::sleep(WATCH_DEBOUNCE).await;
                while rx.try_recv().is_ok() {}
                bridge.publish(ContextId::EXTERNAL, ChangeKind::Changed);
            }
        });

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for StorageWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn touches_slot(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    match file_name {
        Some(name) => event.paths.iter().any(|p| p.file_name() == Some(name)),
        None => true,
    }
}
