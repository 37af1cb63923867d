//! Core domain types for metric monitoring data.

use core::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use time::OffsetDateTime;

use crate::error::ParseError;

/// Category of a metric group.
///
/// Used both as a stored column and as the filter value of the
/// `category/{kind}` address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GroupKind {
    /// Built-in system counters (CPU, memory, battery).
    System,
    /// Hardware sensor sources.
    Sensor,
    /// Application-defined metrics.
    User,
}

impl GroupKind {
    /// Canonical lowercase name, as persisted and as used in addresses.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::System => "system",
            GroupKind::Sensor => "sensor",
            GroupKind::User => "user",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(GroupKind::System),
            "sensor" => Ok(GroupKind::Sensor),
            "user" => Ok(GroupKind::User),
            _ => Err(ParseError::UnknownKind(s.to_string())),
        }
    }
}

/// A named category of related metrics sharing sampling characteristics.
///
/// The `id` is assigned by the collection subsystem and is the stable
/// identity every other relation uses to refer to the group.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricGroup {
    /// Caller-assigned identity, immutable once published.
    pub id: i64,
    /// Unique human-readable title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Whether this group is available on the current device.
    pub supported: bool,
    /// Estimated power cost of sampling this group.
    pub power: f64,
    /// Fastest supported sampling period in milliseconds.
    pub min_interval: i64,
    /// Human-readable upper bound of the group's values.
    pub max_range: String,
    /// Human-readable measurement resolution.
    pub resolution: String,
    /// Category used by `category/{kind}` filtered views.
    pub kind: GroupKind,
}

/// One measurable quantity belonging to a metric group.
///
/// `group_id` is a soft reference: the store does not reject a metric
/// whose group row is absent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Metric {
    pub id: i64,
    /// Owning metric group (soft reference to `MetricGroup::id`).
    pub group_id: i64,
    pub name: String,
    pub units: String,
    /// Maximum expected value.
    pub max: f64,
}

/// Latest operational state for one metric id.
///
/// A denormalized display cache, not historical data: `value` is the most
/// recent reading and is overwritten in place.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricStatus {
    pub id: i64,
    pub max_value: f64,
    /// Most recent reading, for display only.
    pub value: f64,
    /// Milliseconds timestamp of the last update.
    pub last_update: i64,
    /// Active sampling period in milliseconds; 0 when inactive.
    pub period: i64,
}

/// One monitoring session.
///
/// A row is created when a registration is accepted and is never deleted;
/// the session is closed by setting `end_time`. All readings produced by
/// the session carry its id.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Monitor {
    /// Auto-assigned, monotonically increasing session identity.
    pub id: i64,
    /// Milliseconds added to uptime-relative reading timestamps to obtain
    /// wall-clock time.
    pub time_offset: i64,
    /// Wall-clock end of the session in milliseconds; 0 while active.
    pub end_time: i64,
}

impl Monitor {
    /// Whether the session is still open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.end_time == 0
    }

    /// Wall-clock end of the session, if it has ended.
    #[must_use]
    pub fn ended_at(&self) -> Option<OffsetDateTime> {
        if self.end_time == 0 {
            return None;
        }
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.end_time) * 1_000_000).ok()
    }
}

/// One timestamped value for a metric, tagged with the session that
/// produced it. Immutable once written.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Database row id.
    pub id: i64,
    /// Soft reference to `Metric::id`.
    pub metric_id: i64,
    /// Soft reference to `Monitor::id`; the grouping key for purges.
    pub monitor_id: i64,
    /// Uptime-relative capture time in milliseconds.
    pub timestamp: i64,
    pub value: f64,
}

impl Reading {
    /// Wall-clock capture time in milliseconds, given the owning
    /// monitor's offset.
    #[must_use]
    pub fn wall_clock_ms(&self, time_offset: i64) -> i64 {
        self.timestamp + time_offset
    }
}

/// One `(timestamp, value)` pair handed to a batch insert.
///
/// The metric and monitor ids are batch-level parameters, so a sample
/// carries only what varies per row.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Uptime-relative capture time in milliseconds.
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    /// Create a new sample.
    #[must_use]
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}
