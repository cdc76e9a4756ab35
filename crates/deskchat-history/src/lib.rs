//! Transcript persistence, projection and cross-context synchronization.
//!
//! - [`HistoryStore`] owns one persisted history slot plus its in-memory mirror.
//! - [`project`] computes the filtered, newest-first view a transcript pane shows.
//! - [`SyncBridge`] and [`StorageWatcher`] let every open context converge on the
//!   persisted state when some other context changes it.

pub mod error;
pub mod projection;
pub mod store;
pub mod sync;

pub use error::HistoryError;
pub use projection::{project, TranscriptQuery};
pub use store::{export_file_name, read_export, HistoryStore};
pub use sync::{ChangeKind, ContextId, HistoryChange, StorageWatcher, SyncBridge, SyncSubscription};
