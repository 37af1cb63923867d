//! Query builder for bounded reading scans.
//!
//! The address-routed surface returns whole relations or single rows; this
//! builder is the trusted-caller tool for bounding a scan over readings by
//! metric, monitor, time range, and page size.
//!
//! # Example
//!
//! ```
//! use metra_store::{MetricStore, ReadingQuery};
//!
//! let store = MetricStore::open_in_memory()?;
//!
//! // Most recent readings for one monitor session
//! let query = ReadingQuery::new().monitor(1).limit(50);
//! let readings = store.query_readings(&query)?;
//! # Ok::<(), metra_store::Error>(())
//! ```

/// Fluent query builder for readings.
///
/// All filter methods are optional and can be chained in any order. By
/// default results are ordered by `timestamp` descending (newest first).
#[derive(Debug, Default, Clone)]
pub struct ReadingQuery {
    /// Filter by metric id.
    pub metric_id: Option<i64>,
    /// Filter by monitor session id.
    pub monitor_id: Option<i64>,
    /// Include only readings captured at or after this uptime-relative
    /// millisecond timestamp.
    pub since: Option<i64>,
    /// Include only readings captured at or before this uptime-relative
    /// millisecond timestamp.
    pub until: Option<i64>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by timestamp descending (newest first).
    pub newest_first: bool,
}

impl ReadingQuery {
    /// Create a new query with default settings: no filters, no limit,
    /// newest first.
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Filter by metric id.
    pub fn metric(mut self, metric_id: i64) -> Self {
        self.metric_id = Some(metric_id);
        self
    }

    /// Filter by monitor session id.
    pub fn monitor(mut self, monitor_id: i64) -> Self {
        self.monitor_id = Some(monitor_id);
        self
    }

    /// Filter to readings captured at or after this timestamp.
    pub fn since(mut self, timestamp: i64) -> Self {
        self.since = Some(timestamp);
        self
    }

    /// Filter to readings captured at or before this timestamp.
    pub fn until(mut self, timestamp: i64) -> Self {
        self.until = Some(timestamp);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results. Use with `limit()` for pagination.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results chronologically (ascending by `timestamp`).
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(metric_id) = self.metric_id {
            conditions.push("metric_id = ?");
            params.push(Box::new(metric_id));
        }

        if let Some(monitor_id) = self.monitor_id {
            conditions.push("monitor_id = ?");
            params.push(Box::new(monitor_id));
        }

        if let Some(since) = self.since {
            conditions.push("timestamp >= ?");
            params.push(Box::new(since));
        }

        if let Some(until) = self.until {
            conditions.push("timestamp <= ?");
            params.push(Box::new(until));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT id, metric_id, monitor_id, timestamp, value \
             FROM readings {} ORDER BY timestamp {}",
            where_clause, order
        );

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let query = ReadingQuery::new();
        assert!(query.metric_id.is_none());
        assert!(query.monitor_id.is_none());
        assert!(query.since.is_none());
        assert!(query.until.is_none());
        assert!(query.limit.is_none());
        assert!(query.offset.is_none());
        assert!(query.newest_first);
    }

    #[test]
    fn test_default_is_different_from_new() {
        // Default doesn't set newest_first, but new() does
        assert!(!ReadingQuery::default().newest_first);
        assert!(ReadingQuery::new().newest_first);
    }

    #[test]
    fn test_chaining() {
        let query = ReadingQuery::new()
            .metric(7)
            .monitor(2)
            .since(100)
            .until(900)
            .limit(10)
            .offset(5)
            .oldest_first();

        assert_eq!(query.metric_id, Some(7));
        assert_eq!(query.monitor_id, Some(2));
        assert_eq!(query.since, Some(100));
        assert_eq!(query.until, Some(900));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
        assert!(!query.newest_first);
    }

    #[test]
    fn test_build_where_empty() {
        let (where_clause, params) = ReadingQuery::new().build_where();
        assert_eq!(where_clause, "");
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_where_single_filter() {
        let (where_clause, params) = ReadingQuery::new().monitor(3).build_where();
        assert_eq!(where_clause, "WHERE monitor_id = ?");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_build_where_all_filters() {
        let (where_clause, params) = ReadingQuery::new()
            .metric(1)
            .monitor(2)
            .since(10)
            .until(20)
            .build_where();

        assert!(where_clause.contains("metric_id = ?"));
        assert!(where_clause.contains("monitor_id = ?"));
        assert!(where_clause.contains("timestamp >= ?"));
        assert!(where_clause.contains("timestamp <= ?"));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_build_sql_basic() {
        let sql = ReadingQuery::new().build_sql();
        assert!(sql.contains("FROM readings"));
        assert!(sql.contains("ORDER BY timestamp DESC"));
        assert!(!sql.contains("WHERE"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_build_sql_oldest_first_with_pagination() {
        let sql = ReadingQuery::new().oldest_first().limit(100).offset(25).build_sql();
        assert!(sql.contains("ORDER BY timestamp ASC"));
        assert!(sql.contains("LIMIT 100"));
        assert!(sql.contains("OFFSET 25"));
    }

    #[test]
    fn test_build_sql_selects_all_columns() {
        let sql = ReadingQuery::new().build_sql();
        for column in ["id", "metric_id", "monitor_id", "timestamp", "value"] {
            assert!(sql.contains(column), "missing column {column}");
        }
    }
}
