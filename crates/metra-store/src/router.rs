//! Address-routed, read-only query surface.
//!
//! The router resolves a resource [`Address`] to a relation and optional
//! filter, executes the read through the store, and tags the result with
//! the address so the caller can subscribe to change notifications for
//! exactly that resource. Mutations are rejected unconditionally: the
//! write surface exists only on [`MetricStore`], reached by trusted
//! internal callers.

use std::sync::Arc;

use serde::Serialize;

use metra_types::{
    Address, Metric, MetricGroup, MetricStatus, Monitor, Reading, ResourceKind,
};

use crate::error::{Error, Result};
use crate::store::{GroupFilter, MetricFilter, MetricStore, ReadingFilter};

/// Typed rows returned from an address-routed query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rows {
    Groups(Vec<MetricGroup>),
    Metrics(Vec<Metric>),
    Statuses(Vec<MetricStatus>),
    Monitors(Vec<Monitor>),
    Readings(Vec<Reading>),
}

impl Rows {
    /// Number of rows returned.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Rows::Groups(rows) => rows.len(),
            Rows::Metrics(rows) => rows.len(),
            Rows::Statuses(rows) => rows.len(),
            Rows::Monitors(rows) => rows.len(),
            Rows::Readings(rows) => rows.len(),
        }
    }

    /// Whether the query matched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of an address-routed query.
///
/// Serializable so an observer process can be handed results over an
/// inter-process boundary without re-reading the database.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// The resolved address; also the key to subscribe with for
    /// invalidation of this result.
    pub address: Address,
    /// Collection or item, derived from the address shape.
    pub kind: ResourceKind,
    /// The matched rows.
    pub rows: Rows,
}

/// Read-only router from resource addresses to relations.
#[derive(Clone)]
pub struct QueryRouter {
    store: Arc<MetricStore>,
}

impl QueryRouter {
    /// Create a router over the given store handle.
    pub fn new(store: Arc<MetricStore>) -> Self {
        Self { store }
    }

    /// Execute a read query for the given address.
    pub fn query(&self, address: &Address) -> Result<QueryResult> {
        let rows = match *address {
            Address::Groups => Rows::Groups(self.store.select_groups(None)?),
            Address::Group(id) => {
                Rows::Groups(self.store.select_groups(Some(GroupFilter::Id(id)))?)
            }
            Address::Category(kind) => {
                Rows::Groups(self.store.select_groups(Some(GroupFilter::Kind(kind)))?)
            }
            Address::Statuses => Rows::Statuses(self.store.select_statuses(None)?),
            Address::Status(id) => Rows::Statuses(self.store.select_statuses(Some(id))?),
            Address::Metrics => Rows::Metrics(self.store.select_metrics(None)?),
            Address::Metric(id) => {
                Rows::Metrics(self.store.select_metrics(Some(MetricFilter::Id(id)))?)
            }
            Address::GroupMetrics(group_id) => Rows::Metrics(
                self.store
                    .select_metrics(Some(MetricFilter::Group(group_id)))?,
            ),
            Address::Readings => Rows::Readings(self.store.select_readings(None)?),
            Address::Reading(id) => {
                Rows::Readings(self.store.select_readings(Some(ReadingFilter::Id(id)))?)
            }
            Address::MetricReadings(metric_id) => Rows::Readings(
                self.store
                    .select_readings(Some(ReadingFilter::Metric(metric_id)))?,
            ),
            Address::MonitorReadings(monitor_id) => Rows::Readings(
                self.store
                    .select_readings(Some(ReadingFilter::Monitor(monitor_id)))?,
            ),
            Address::Monitor(id) => Rows::Monitors(self.store.select_monitors(Some(id))?),
        };

        Ok(QueryResult {
            address: *address,
            kind: address.kind(),
            rows,
        })
    }

    /// Parse and execute an externally supplied address path.
    ///
    /// An unrecognized path is rejected before storage is touched.
    pub fn query_path(&self, path: &str) -> Result<QueryResult> {
        let address: Address = path.parse()?;
        self.query(&address)
    }

    /// Inserts through the read-only surface are always rejected.
    pub fn insert(&self, _address: &Address) -> Result<i64> {
        Err(Error::UnsupportedOperation("insert"))
    }

    /// Updates through the read-only surface are always rejected.
    pub fn update(&self, _address: &Address) -> Result<usize> {
        Err(Error::UnsupportedOperation("update"))
    }

    /// Deletes through the read-only surface are always rejected.
    pub fn delete(&self, _address: &Address) -> Result<usize> {
        Err(Error::UnsupportedOperation("delete"))
    }
}
