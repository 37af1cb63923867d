//! Main store implementation: the sole writer over the metric relations.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;
use time::OffsetDateTime;
use tracing::{debug, info};

use metra_types::{Address, GroupKind, Metric, MetricGroup, MetricStatus, Monitor, Reading, Sample};

use crate::error::{Error, Result};
use crate::notify::{ChangeBus, ChangeReceiver};
use crate::queries::ReadingQuery;
use crate::schema;

/// Row filter for metric group selects.
#[derive(Debug, Clone, Copy)]
pub enum GroupFilter {
    /// Match one group by id.
    Id(i64),
    /// Match every group in one category.
    Kind(GroupKind),
}

/// Row filter for metric selects.
#[derive(Debug, Clone, Copy)]
pub enum MetricFilter {
    /// Match one metric by id.
    Id(i64),
    /// Match every metric in one group.
    Group(i64),
}

/// Row filter for reading selects.
#[derive(Debug, Clone, Copy)]
pub enum ReadingFilter {
    /// Match one reading by row id.
    Id(i64),
    /// Match every reading for one metric.
    Metric(i64),
    /// Match every reading for one monitor session.
    Monitor(i64),
}

/// SQLite-backed store for metric catalogs, monitor sessions, and
/// readings.
///
/// A `MetricStore` owns the only connection to its database; no other
/// component may hold a second handle to the same file. Mutations are
/// serialized by an internal lock, and each one publishes its documented
/// change address(es) only after the write has committed. Construct the
/// store once and hand it (typically inside an `Arc`) to every component
/// that needs it.
pub struct MetricStore {
    conn: Mutex<Connection>,
    changes: ChangeBus,
}

impl MetricStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening metric database at {}", path.display());
        let conn = Connection::open(path)?;

        // WAL keeps readers unblocked while a mutation commits
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            changes: ChangeBus::default(),
        })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            changes: ChangeBus::default(),
        })
    }

    /// Subscribe to post-commit change notifications.
    pub fn subscribe(&self) -> ChangeReceiver {
        self.changes.subscribe()
    }

    /// The change bus mutations publish into.
    pub fn changes(&self) -> &ChangeBus {
        &self.changes
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Catalog operations
impl MetricStore {
    /// Insert or replace a metric group, matched by its caller-assigned
    /// id. Publishes the group's own address and its category address.
    pub fn upsert_metric_group(&self, group: &MetricGroup) -> Result<i64> {
        let row_id = {
            let conn = self.conn();
            conn.execute(
                "INSERT OR REPLACE INTO metric_groups
                 (id, title, description, supported, power, min_interval, max_range, resolution, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    group.id,
                    group.title,
                    group.description,
                    group.supported,
                    group.power,
                    group.min_interval,
                    group.max_range,
                    group.resolution,
                    group.kind.as_str(),
                ],
            )?;
            conn.last_insert_rowid()
        };

        self.changes.publish(Address::Group(group.id));
        self.changes.publish(Address::Category(group.kind));
        Ok(row_id)
    }

    /// Insert or replace a metric, matched by id.
    pub fn upsert_metric(&self, metric: &Metric) -> Result<i64> {
        let row_id = {
            let conn = self.conn();
            conn.execute(
                "INSERT OR REPLACE INTO metrics (id, group_id, name, units, max)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    metric.id,
                    metric.group_id,
                    metric.name,
                    metric.units,
                    metric.max
                ],
            )?;
            conn.last_insert_rowid()
        };

        self.changes.publish(Address::Metric(metric.id));
        Ok(row_id)
    }

    /// Insert or replace the latest-state row for a metric id.
    pub fn upsert_metric_status(&self, status: &MetricStatus) -> Result<i64> {
        let row_id = {
            let conn = self.conn();
            conn.execute(
                "INSERT OR REPLACE INTO metric_status (id, max_value, value, last_update, period)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    status.id,
                    status.max_value,
                    status.value,
                    status.last_update,
                    status.period
                ],
            )?;
            conn.last_insert_rowid()
        };

        self.changes.publish(Address::Status(status.id));
        Ok(row_id)
    }

    /// Remove one metric group by id.
    ///
    /// Returns the number of rows removed (0 or 1). The group's address
    /// is published either way.
    pub fn delete_metric_group(&self, group_id: i64) -> Result<usize> {
        let deleted = {
            let conn = self.conn();
            conn.execute("DELETE FROM metric_groups WHERE id = ?", [group_id])?
        };

        // Notify even when nothing matched
        self.changes.publish(Address::Group(group_id));
        Ok(deleted)
    }

    /// Remove every metric belonging to one group.
    pub fn delete_metrics_by_group(&self, group_id: i64) -> Result<usize> {
        let deleted = {
            let conn = self.conn();
            conn.execute("DELETE FROM metrics WHERE group_id = ?", [group_id])?
        };

        self.changes.publish(Address::GroupMetrics(group_id));
        Ok(deleted)
    }
}

// Session operations
impl MetricStore {
    /// Open a new monitor session with the given clock correction.
    ///
    /// Session ids are auto-assigned and monotonically increasing.
    pub fn create_monitor(&self, time_offset: i64) -> Result<i64> {
        let monitor_id = {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO monitors (time_offset, end_time) VALUES (?1, 0)",
                [time_offset],
            )?;
            conn.last_insert_rowid()
        };

        debug!("Opened monitor session {}", monitor_id);
        self.changes.publish(Address::Monitor(monitor_id));
        Ok(monitor_id)
    }

    /// Close a monitor session, stamping the wall-clock end time.
    ///
    /// Closing an unknown or already-ended session updates nothing and
    /// returns 0.
    pub fn end_monitor(&self, monitor_id: i64) -> Result<usize> {
        let end_time = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
        let updated = {
            let conn = self.conn();
            conn.execute(
                "UPDATE monitors SET end_time = ?2 WHERE id = ?1 AND end_time = 0",
                rusqlite::params![monitor_id, end_time],
            )?
        };

        self.changes.publish(Address::Monitor(monitor_id));
        Ok(updated)
    }
}

// Reading operations
impl MetricStore {
    /// Insert a single reading.
    pub fn insert_reading(
        &self,
        metric_id: i64,
        monitor_id: i64,
        timestamp: i64,
        value: f64,
    ) -> Result<i64> {
        let row_id = {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO readings (metric_id, monitor_id, timestamp, value)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![metric_id, monitor_id, timestamp, value],
            )?;
            conn.last_insert_rowid()
        };

        self.changes.publish(Address::Reading(row_id));
        Ok(row_id)
    }

    /// Insert a batch of readings for one metric and monitor atomically.
    ///
    /// The whole batch runs in a single transaction: either every sample
    /// commits or none does. On success the returned count equals the
    /// batch length and one notification is published for the monitor's
    /// data address; on failure the transaction is rolled back and the
    /// error is returned with nothing persisted.
    pub fn insert_reading_batch(
        &self,
        metric_id: i64,
        monitor_id: i64,
        samples: &[Sample],
    ) -> Result<usize> {
        {
            let mut conn = self.conn();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO readings (metric_id, monitor_id, timestamp, value)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for sample in samples {
                    stmt.execute(rusqlite::params![
                        metric_id,
                        monitor_id,
                        sample.timestamp,
                        sample.value
                    ])?;
                }
            }
            tx.commit()?;
        }

        info!(
            "Inserted batch of {} readings for monitor {}",
            samples.len(),
            monitor_id
        );
        self.changes.publish(Address::MonitorReadings(monitor_id));
        Ok(samples.len())
    }

    /// Remove every reading produced by a monitor session older than the
    /// threshold (`monitor_id < threshold`); readings for the threshold
    /// session and later ones are retained.
    pub fn purge_readings(&self, monitor_threshold: i64) -> Result<usize> {
        let purged = {
            let conn = self.conn();
            conn.execute(
                "DELETE FROM readings WHERE monitor_id < ?",
                [monitor_threshold],
            )?
        };

        info!(
            "Purged {} readings below monitor {}",
            purged, monitor_threshold
        );
        self.changes.publish(Address::Readings);
        Ok(purged)
    }

    /// Query readings with filters.
    pub fn query_readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let conn = self.conn();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let readings = stmt
            .query_map(params_ref.as_slice(), map_reading)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Count readings, optionally for one monitor session.
    pub fn count_readings(&self, monitor_id: Option<i64>) -> Result<u64> {
        let conn = self.conn();
        let count: i64 = match monitor_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM readings WHERE monitor_id = ?",
                [id],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?,
        };

        Ok(count as u64)
    }
}

// Read path shared with the query router
impl MetricStore {
    /// Select metric groups, all or filtered, in id order.
    pub fn select_groups(&self, filter: Option<GroupFilter>) -> Result<Vec<MetricGroup>> {
        let mut sql = String::from(
            "SELECT id, title, description, supported, power, min_interval, max_range, resolution, kind \
             FROM metric_groups",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        match filter {
            Some(GroupFilter::Id(id)) => {
                sql.push_str(" WHERE id = ?");
                params.push(Box::new(id));
            }
            Some(GroupFilter::Kind(kind)) => {
                sql.push_str(" WHERE kind = ?");
                params.push(Box::new(kind.to_string()));
            }
            None => {}
        }
        sql.push_str(" ORDER BY id");

        let conn = self.conn();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let groups = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok(MetricGroup {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    supported: row.get(3)?,
                    power: row.get(4)?,
                    min_interval: row.get(5)?,
                    max_range: row.get(6)?,
                    resolution: row.get(7)?,
                    kind: parse_kind(&row.get::<_, String>(8)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(groups)
    }

    /// Select metrics, all or filtered, in id order.
    pub fn select_metrics(&self, filter: Option<MetricFilter>) -> Result<Vec<Metric>> {
        let mut sql = String::from("SELECT id, group_id, name, units, max FROM metrics");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        match filter {
            Some(MetricFilter::Id(id)) => {
                sql.push_str(" WHERE id = ?");
                params.push(Box::new(id));
            }
            Some(MetricFilter::Group(group_id)) => {
                sql.push_str(" WHERE group_id = ?");
                params.push(Box::new(group_id));
            }
            None => {}
        }
        sql.push_str(" ORDER BY id");

        let conn = self.conn();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let metrics = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok(Metric {
                    id: row.get(0)?,
                    group_id: row.get(1)?,
                    name: row.get(2)?,
                    units: row.get(3)?,
                    max: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(metrics)
    }

    /// Select status rows, all or one, in id order.
    pub fn select_statuses(&self, id: Option<i64>) -> Result<Vec<MetricStatus>> {
        let mut sql =
            String::from("SELECT id, max_value, value, last_update, period FROM metric_status");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(id) = id {
            sql.push_str(" WHERE id = ?");
            params.push(Box::new(id));
        }
        sql.push_str(" ORDER BY id");

        let conn = self.conn();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let statuses = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok(MetricStatus {
                    id: row.get(0)?,
                    max_value: row.get(1)?,
                    value: row.get(2)?,
                    last_update: row.get(3)?,
                    period: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(statuses)
    }

    /// Select monitor sessions, all or one, in id order.
    pub fn select_monitors(&self, id: Option<i64>) -> Result<Vec<Monitor>> {
        let mut sql = String::from("SELECT id, time_offset, end_time FROM monitors");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(id) = id {
            sql.push_str(" WHERE id = ?");
            params.push(Box::new(id));
        }
        sql.push_str(" ORDER BY id");

        let conn = self.conn();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let monitors = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok(Monitor {
                    id: row.get(0)?,
                    time_offset: row.get(1)?,
                    end_time: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(monitors)
    }

    /// Select readings, all or filtered, in insertion (id) order.
    pub fn select_readings(&self, filter: Option<ReadingFilter>) -> Result<Vec<Reading>> {
        let mut sql =
            String::from("SELECT id, metric_id, monitor_id, timestamp, value FROM readings");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        match filter {
            Some(ReadingFilter::Id(id)) => {
                sql.push_str(" WHERE id = ?");
                params.push(Box::new(id));
            }
            Some(ReadingFilter::Metric(metric_id)) => {
                sql.push_str(" WHERE metric_id = ?");
                params.push(Box::new(metric_id));
            }
            Some(ReadingFilter::Monitor(monitor_id)) => {
                sql.push_str(" WHERE monitor_id = ?");
                params.push(Box::new(monitor_id));
            }
            None => {}
        }
        sql.push_str(" ORDER BY id");

        let conn = self.conn();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let readings = stmt
            .query_map(params_ref.as_slice(), map_reading)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Get one metric group by id.
    pub fn get_metric_group(&self, id: i64) -> Result<Option<MetricGroup>> {
        Ok(self.select_groups(Some(GroupFilter::Id(id)))?.pop())
    }

    /// Get one metric by id.
    pub fn get_metric(&self, id: i64) -> Result<Option<Metric>> {
        Ok(self.select_metrics(Some(MetricFilter::Id(id)))?.pop())
    }

    /// Get one status row by id.
    pub fn get_status(&self, id: i64) -> Result<Option<MetricStatus>> {
        Ok(self.select_statuses(Some(id))?.pop())
    }

    /// Get one monitor session by id.
    pub fn get_monitor(&self, id: i64) -> Result<Option<Monitor>> {
        Ok(self.select_monitors(Some(id))?.pop())
    }

    /// Get one reading by row id.
    pub fn get_reading(&self, id: i64) -> Result<Option<Reading>> {
        Ok(self.select_readings(Some(ReadingFilter::Id(id)))?.pop())
    }
}

fn map_reading(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reading> {
    Ok(Reading {
        id: row.get(0)?,
        metric_id: row.get(1)?,
        monitor_id: row.get(2)?,
        timestamp: row.get(3)?,
        value: row.get(4)?,
    })
}

fn parse_kind(s: &str) -> GroupKind {
    s.parse().unwrap_or(GroupKind::System)
}
