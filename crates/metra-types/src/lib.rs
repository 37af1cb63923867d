//! Platform-agnostic types for the metra metric store.
//!
//! This crate provides the shared vocabulary used by the store
//! (metra-store) and by observers that only consume query results and
//! change notifications.
//!
//! # Features
//!
//! - The five persisted entities: groups, metrics, statuses, monitors,
//!   readings
//! - The resource [`Address`] grammar of the read-only query surface
//! - Parse errors for addresses and category names
//!
//! # Example
//!
//! ```
//! use metra_types::{Address, ResourceKind};
//!
//! let address: Address = "monitordata/3".parse()?;
//! assert_eq!(address, Address::MonitorReadings(3));
//! assert_eq!(address.kind(), ResourceKind::Collection);
//! # Ok::<(), metra_types::ParseError>(())
//! ```

pub mod address;
pub mod error;
pub mod types;

pub use address::{Address, ResourceKind};
pub use error::{ParseError, ParseResult};
pub use types::{GroupKind, Metric, MetricGroup, MetricStatus, Monitor, Reading, Sample};
