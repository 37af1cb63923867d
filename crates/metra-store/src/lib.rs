//! Local data persistence for device-monitoring metrics.
//!
//! This crate is the persistent store of a device-monitoring service: it
//! records time-stamped metric readings, tracks which metric groups and
//! metrics exist and whether they are supported, tracks monitor sessions
//! and their active windows, and exposes an address-routed read-only
//! query surface with change notification so observers can react to new
//! data without polling.
//!
//! # Features
//!
//! - Five-relation SQLite schema with a destructive version upgrade
//! - A single serialized writer ([`MetricStore`]) with atomic batch
//!   inserts and post-commit change notification
//! - Address-routed read-only queries ([`QueryRouter`]) with
//!   collection/item content kinds
//! - Bounded reading scans ([`ReadingQuery`]) and CSV/JSON export
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use metra_store::{MetricStore, QueryRouter};
//! use metra_types::Sample;
//!
//! let store = Arc::new(MetricStore::open_default()?);
//! let router = QueryRouter::new(store.clone());
//!
//! let _changes = store.subscribe();
//!
//! let monitor = store.create_monitor(0)?;
//! store.insert_reading_batch(7, monitor, &[Sample::new(100, 1.0)])?;
//!
//! // Observers re-query when a notification arrives for their address
//! let result = router.query_path("monitordata/1")?;
//! assert_eq!(result.rows.len(), 1);
//! # Ok::<(), metra_store::Error>(())
//! ```

mod error;
mod export;
mod notify;
mod queries;
mod router;
mod schema;
mod store;

pub use error::{Error, Result};
pub use notify::{ChangeBus, ChangeReceiver, ChangeSender};
pub use queries::ReadingQuery;
pub use router::{QueryResult, QueryRouter, Rows};
pub use store::{GroupFilter, MetricFilter, MetricStore, ReadingFilter};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/metra/data.db`
/// - macOS: `~/Library/Application Support/metra/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\metra\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("metra")
        .join("data.db")
}
