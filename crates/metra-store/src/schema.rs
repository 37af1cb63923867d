//! Database schema and the destructive upgrade path.

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
///
/// A fresh database gets the current schema. A database written by an
/// older version is upgraded destructively: every relation is dropped and
/// recreated, and stored readings are discarded.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = schema_version(conn)?;

    if version == 0 {
        create_relations(conn)?;
        write_schema_version(conn, SCHEMA_VERSION)?;
    } else if version < SCHEMA_VERSION {
        recreate(conn)?;
    }

    Ok(())
}

/// Read the stored schema version; 0 means a fresh database.
fn schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

fn write_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

/// Create the five relations and the version-tracking row.
///
/// No FOREIGN KEY clauses: references between relations are soft by
/// design, and no secondary indexes exist beyond the primary keys.
fn create_relations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- Metric group catalog
        CREATE TABLE IF NOT EXISTS metric_groups (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            supported INTEGER NOT NULL,
            power REAL NOT NULL,
            min_interval INTEGER NOT NULL,
            max_range TEXT NOT NULL,
            resolution TEXT NOT NULL,
            kind TEXT NOT NULL
        );

        -- Metrics within groups; group_id is a soft reference
        CREATE TABLE IF NOT EXISTS metrics (
            id INTEGER PRIMARY KEY,
            group_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            units TEXT NOT NULL,
            max REAL NOT NULL
        );

        -- Latest state per metric id; a display cache, not history
        CREATE TABLE IF NOT EXISTS metric_status (
            id INTEGER PRIMARY KEY,
            max_value REAL NOT NULL,
            value REAL NOT NULL,
            last_update INTEGER NOT NULL,
            period INTEGER NOT NULL
        );

        -- Monitoring sessions; end_time 0 while active
        CREATE TABLE IF NOT EXISTS monitors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            time_offset INTEGER NOT NULL,
            end_time INTEGER NOT NULL DEFAULT 0
        );

        -- Timestamped readings tagged with metric and monitor session
        CREATE TABLE IF NOT EXISTS readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            metric_id INTEGER NOT NULL,
            monitor_id INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            value REAL NOT NULL
        );
        "#,
    )?;

    Ok(())
}

/// Drop and recreate every relation. Stored readings do not survive.
fn recreate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS metric_groups;
         DROP TABLE IF EXISTS metrics;
         DROP TABLE IF EXISTS metric_status;
         DROP TABLE IF EXISTS monitors;
         DROP TABLE IF EXISTS readings;",
    )?;
    create_relations(conn)?;
    write_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_initialize_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let tables = table_names(&conn);
        for table in [
            "metric_groups",
            "metrics",
            "metric_status",
            "monitors",
            "readings",
            "schema_version",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_schema_version_tracking() {
        let conn = Connection::open_in_memory().unwrap();

        assert_eq!(schema_version(&conn).unwrap(), 0);

        initialize(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_recreate_discards_stored_rows() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        conn.execute(
            "INSERT INTO readings (metric_id, monitor_id, timestamp, value) VALUES (1, 1, 100, 2.0)",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO monitors (time_offset, end_time) VALUES (0, 0)", [])
            .unwrap();

        recreate(&conn).unwrap();

        let readings: i64 = conn
            .query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))
            .unwrap();
        let monitors: i64 = conn
            .query_row("SELECT COUNT(*) FROM monitors", [], |row| row.get(0))
            .unwrap();
        assert_eq!(readings, 0);
        assert_eq!(monitors, 0);
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
