use chrono::{DateTime, Utc};
use deskchat_types::TranscriptEntry;
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::error::HistoryError;
use crate::sync::{ChangeKind, ContextId, SyncBridge};

/// Durable transcript slot with an in-memory mirror.
///
/// Every mutating call holds the store lock and an exclusive advisory lock
/// on the sibling `<slot>.lock` file, re-reads the persisted slot, writes the
/// new document through a temp file + rename, and only then updates the
/// mirror. Stores in other tasks or processes on the same slot serialize on
/// the file lock. A reader never sees a half-written slot, and the mirror
/// never runs ahead of what is on disk.
pub struct HistoryStore {
    path: PathBuf,
    context: ContextId,
    mirror: Mutex<Vec<TranscriptEntry>>,
    bridge: Option<SyncBridge>,
    closed: AtomicBool,
}

impl HistoryStore {
    /// Open (or lazily create) the history slot at `path`
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| HistoryError::io(parent, e))?;
            }
        }

        let initial = read_persisted(&path);
        log::info!("history slot {} opened ({} entries)", path.display(), initial.len());

        Ok(Self {
            path,
            context: ContextId::new(),
            mirror: Mutex::new(initial),
            bridge: None,
            closed: AtomicBool::new(false),
        })
    }

    /// Publish this store's changes on `bridge` and tag them with this store's context
    pub fn with_bridge(mut self, bridge: SyncBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// Read the persisted transcript. Absent, unreadable and corrupt slots all
    /// read as an empty history. The mirror is resynchronized to the result.
    pub async fn load(&self) -> Vec<TranscriptEntry> {
        let mut mirror = self.mirror.lock().await;
        let persisted = read_persisted(&self.path);
        *mirror = persisted.clone();
        persisted
    }

    /// Re-read the slot and return the new transcript only if it differs from the mirror.
    ///
    /// Used on change notifications: a write this store made itself already
    /// updated the mirror, so it yields `None` and the caller skips the redraw.
    pub async fn refresh(&self) -> Option<Vec<TranscriptEntry>> {
        let mut mirror = self.mirror.lock().await;
        let persisted = read_persisted(&self.path);
        if *mirror == persisted {
            return None;
        }
        *mirror = persisted.clone();
        Some(persisted)
    }

    /// Snapshot of the in-memory mirror (no disk access)
    pub async fn entries(&self) -> Vec<TranscriptEntry> {
        self.mirror.lock().await.clone()
    }

    /// Append one entry to the persisted slot and the mirror.
    ///
    /// The entry's timestamp is raised to the last entry's timestamp if the
    /// clock went backwards, so insertion order never decreases in time.
    /// Returns the entry as stored. On failure neither side changes.
    pub async fn append(&self, mut entry: TranscriptEntry) -> Result<TranscriptEntry, HistoryError> {
        if self.is_closed() {
            return Err(HistoryError::Closed);
        }

        let mut mirror = self.mirror.lock().await;
        let mut slot_lock = open_lock_file(&self.path)?;
        let held = slot_lock.write().map_err(|e| HistoryError::io(lock_path(&self.path), e))?;
        let mut next = read_persisted(&self.path);

        if let Some(last) = next.last() {
            if entry.timestamp < last.timestamp {
                entry.timestamp = last.timestamp;
            }
        }
        next.push(entry.clone());

        write_atomic(&self.path, &next)?;
        *mirror = next;
        drop(held);
        drop(mirror);

        log::debug!("appended {} entry to {}", entry.entry_type, self.path.display());
        self.publish(ChangeKind::Appended(entry.clone()));
        Ok(entry)
    }

    /// Erase the persisted slot and the mirror. Irreversible; confirmation is the caller's job.
    pub async fn clear(&self) -> Result<(), HistoryError> {
        if self.is_closed() {
            return Err(HistoryError::Closed);
        }

        let mut mirror = self.mirror.lock().await;
        let mut slot_lock = open_lock_file(&self.path)?;
        let held = slot_lock.write().map_err(|e| HistoryError::io(lock_path(&self.path), e))?;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(HistoryError::io(&self.path, e)),
        }
        mirror.clear();
        drop(held);
        drop(mirror);

        log::info!("history slot {} cleared", self.path.display());
        self.publish(ChangeKind::Cleared);
        Ok(())
    }

    /// Serialize the persisted transcript as a pretty-printed JSON document
    pub async fn export(&self) -> Result<Vec<u8>, HistoryError> {
        let entries = self.load().await;
        Ok(serde_json::to_vec_pretty(&entries)?)
    }

    /// Write the export document into `dir` under a timestamped name
    pub async fn export_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, HistoryError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| HistoryError::io(dir, e))?;

        let bytes = self.export().await?;
        let file_path = dir.join(export_file_name(Utc::now()));
        std::fs::write(&file_path, bytes).map_err(|e| HistoryError::io(&file_path, e))?;

        log::info!("history exported to {}", file_path.display());
        Ok(file_path)
    }

    /// Tear the store down. Later appends and clears fail with `Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn publish(&self, kind: ChangeKind) {
        if let Some(bridge) = &self.bridge {
            bridge.publish(self.context, kind);
        }
    }
}

/// File name of an export taken at `now`, e.g. `chat_history_2024-05-01T10-00-00.000Z.json`
pub fn export_file_name(now: DateTime<Utc>) -> String {
    // ':' is not allowed in file names on every platform
    format!("chat_history_{}.json", now.format("%Y-%m-%dT%H-%M-%S%.3fZ"))
}

/// Parse an export document back into a transcript
pub fn read_export(bytes: &[u8]) -> Result<Vec<TranscriptEntry>, HistoryError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn read_persisted(path: &Path) -> Vec<TranscriptEntry> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            log::warn!("history slot {} unreadable, treating as empty: {}", path.display(), e);
            return Vec::new();
        }
    };

    if content.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("history slot {} is corrupt, treating as empty: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// `chatHistory.json` -> `chatHistory.json.lock`
fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

fn open_lock_file(path: &Path) -> Result<RwLock<File>, HistoryError> {
    let lock_path = lock_path(path);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| HistoryError::io(&lock_path, e))?;
    Ok(RwLock::new(file))
}

fn write_atomic(path: &Path, entries: &[TranscriptEntry]) -> Result<(), HistoryError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let json = serde_json::to_vec(entries)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| HistoryError::io(dir, e))?;
    tmp.write_all(&json).map_err(|e| HistoryError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| HistoryError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| HistoryError::io(path, e.error))?;
    Ok(())
}
