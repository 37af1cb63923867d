//! Resource addresses for the read-only query surface.
//!
//! An address is a hierarchical path naming a whole relation, a single
//! row, or a filtered slice of a relation. The string form produced by
//! [`fmt::Display`] is the canonical representation: change notifications
//! carry addresses, and an observer compares them against the address a
//! query result was tagged with.

use core::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::types::GroupKind;

/// Whether an address names a collection of rows or a single item.
///
/// Filtered slices (`category/...`, `metricgrp/...`, `metricdata/...`,
/// `monitordata/...`) are collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResourceKind {
    /// Zero or more rows.
    Collection,
    /// At most one row.
    Item,
}

/// A parsed resource address.
///
/// | Path | Variant |
/// |---|---|
/// | `info` | `Groups` |
/// | `info/{id}` | `Group` |
/// | `category/{kind}` | `Category` |
/// | `status` | `Statuses` |
/// | `status/{id}` | `Status` |
/// | `metrics` | `Metrics` |
/// | `metrics/{id}` | `Metric` |
/// | `metricgrp/{group_id}` | `GroupMetrics` |
/// | `data` | `Readings` |
/// | `data/{id}` | `Reading` |
/// | `metricdata/{metric_id}` | `MetricReadings` |
/// | `monitordata/{monitor_id}` | `MonitorReadings` |
/// | `monitor/{id}` | `Monitor` |
///
/// A single leading `/` is tolerated; anything else is rejected with
/// [`ParseError::InvalidAddress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Address {
    /// Every metric group.
    Groups,
    /// One metric group.
    Group(i64),
    /// Metric groups in one category.
    Category(GroupKind),
    /// Every status row.
    Statuses,
    /// One status row.
    Status(i64),
    /// Every metric.
    Metrics,
    /// One metric.
    Metric(i64),
    /// Metrics belonging to one group.
    GroupMetrics(i64),
    /// Every reading.
    Readings,
    /// One reading.
    Reading(i64),
    /// Readings for one metric.
    MetricReadings(i64),
    /// Readings for one monitor session.
    MonitorReadings(i64),
    /// One monitor session.
    Monitor(i64),
}

impl Address {
    /// Content kind derivable from the address shape.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Address::Group(_)
            | Address::Status(_)
            | Address::Metric(_)
            | Address::Reading(_)
            | Address::Monitor(_) => ResourceKind::Item,
            Address::Groups
            | Address::Category(_)
            | Address::Statuses
            | Address::Metrics
            | Address::GroupMetrics(_)
            | Address::Readings
            | Address::MetricReadings(_)
            | Address::MonitorReadings(_) => ResourceKind::Collection,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Groups => f.write_str("info"),
            Address::Group(id) => write!(f, "info/{id}"),
            Address::Category(kind) => write!(f, "category/{kind}"),
            Address::Statuses => f.write_str("status"),
            Address::Status(id) => write!(f, "status/{id}"),
            Address::Metrics => f.write_str("metrics"),
            Address::Metric(id) => write!(f, "metrics/{id}"),
            Address::GroupMetrics(id) => write!(f, "metricgrp/{id}"),
            Address::Readings => f.write_str("data"),
            Address::Reading(id) => write!(f, "data/{id}"),
            Address::MetricReadings(id) => write!(f, "metricdata/{id}"),
            Address::MonitorReadings(id) => write!(f, "monitordata/{id}"),
            Address::Monitor(id) => write!(f, "monitor/{id}"),
        }
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.strip_prefix('/').unwrap_or(s);
        let mut segments = path.split('/');
        let head = segments.next().unwrap_or_default();
        let arg = segments.next();

        // At most two segments, none of them empty.
        if segments.next().is_some() || head.is_empty() || arg.is_some_and(str::is_empty) {
            return Err(ParseError::InvalidAddress(s.to_string()));
        }

        match (head, arg) {
            ("info", None) => Ok(Address::Groups),
            ("info", Some(id)) => Ok(Address::Group(parse_id(id, s)?)),
            ("category", Some(kind)) => kind
                .parse()
                .map(Address::Category)
                .map_err(|_| ParseError::InvalidAddress(s.to_string())),
            ("status", None) => Ok(Address::Statuses),
            ("status", Some(id)) => Ok(Address::Status(parse_id(id, s)?)),
            ("metrics", None) => Ok(Address::Metrics),
            ("metrics", Some(id)) => Ok(Address::Metric(parse_id(id, s)?)),
            ("metricgrp", Some(id)) => Ok(Address::GroupMetrics(parse_id(id, s)?)),
            ("data", None) => Ok(Address::Readings),
            ("data", Some(id)) => Ok(Address::Reading(parse_id(id, s)?)),
            ("metricdata", Some(id)) => Ok(Address::MetricReadings(parse_id(id, s)?)),
            ("monitordata", Some(id)) => Ok(Address::MonitorReadings(parse_id(id, s)?)),
            ("monitor", Some(id)) => Ok(Address::Monitor(parse_id(id, s)?)),
            _ => Err(ParseError::InvalidAddress(s.to_string())),
        }
    }
}

fn parse_id(segment: &str, full: &str) -> Result<i64, ParseError> {
    match segment.parse::<i64>() {
        Ok(id) if id >= 0 => Ok(id),
        _ => Err(ParseError::InvalidAddress(full.to_string())),
    }
}
