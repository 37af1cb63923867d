//! Export stored readings as CSV or JSON.
//!
//! Read-only extraction for diagnostics and offline analysis; the upload
//! transport that ships data to an aggregation server lives elsewhere.

use std::io::Write;

use tracing::info;

use crate::error::Result;
use crate::queries::ReadingQuery;
use crate::store::MetricStore;

impl MetricStore {
    /// Write the readings matched by `query` as CSV, one row per reading
    /// with a header line. Returns the number of rows written.
    pub fn export_readings_csv<W: Write>(&self, writer: W, query: &ReadingQuery) -> Result<usize> {
        let readings = self.query_readings(query)?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        for reading in &readings {
            csv_writer.serialize(reading)?;
        }
        csv_writer.flush()?;

        info!("Exported {} readings as CSV", readings.len());
        Ok(readings.len())
    }

    /// Write the readings matched by `query` as a JSON array. Returns
    /// the number of rows written.
    pub fn export_readings_json<W: Write>(&self, writer: W, query: &ReadingQuery) -> Result<usize> {
        let readings = self.query_readings(query)?;
        serde_json::to_writer(writer, &readings)?;

        info!("Exported {} readings as JSON", readings.len());
        Ok(readings.len())
    }
}
