use chrono::{Datelike, NaiveDateTime};
use std::collections::BTreeSet;

/// Placeholder region advertised when no records survived loading, so the
/// region selector never presents zero options.
pub const NO_DATA_REGION: &str = "No Data Available";

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English month name for a 1-based month number.
pub fn month_name(month_number: u32) -> Option<&'static str> {
    let index = month_number.checked_sub(1)? as usize;
    MONTH_NAMES.get(index).copied()
}

/// One surviving application row. Calendar fields are derived from
/// `timestamp` at construction and never mutated independently.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRecord {
    pub timestamp: NaiveDateTime,
    /// Trimmed, non-empty region exactly as it appeared in the source.
    pub region: String,
    /// Trimmed + lowercased; always `"paid"` after loading.
    pub status: String,
    pub day_of_month: u32,
    pub year: i32,
    pub month_number: u32,
    /// Caller-supplied provenance tag for the source dataset. Independent of
    /// the derived `year`.
    pub source_label: String,
}

impl PreparedRecord {
    pub fn from_parts(
        timestamp: NaiveDateTime,
        region: String,
        status: String,
        source_label: String,
    ) -> Self {
        Self {
            day_of_month: timestamp.day(),
            year: timestamp.year(),
            month_number: timestamp.month(),
            timestamp,
            region,
            status,
            source_label,
        }
    }
}

/// Startup-time concatenation of all per-source prepared sequences. Built
/// once, then shared read-only across request handlers.
#[derive(Debug)]
pub struct UnifiedDataset {
    records: Vec<PreparedRecord>,
    regions: Vec<String>,
}

impl UnifiedDataset {
    pub fn records(&self) -> &[PreparedRecord] {
        &self.records
    }

    /// Sorted distinct regions, or the single [`NO_DATA_REGION`] sentinel
    /// when the dataset is empty.
    pub fn available_regions(&self) -> &[String] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Merge per-source record sequences into one dataset, preserving relative
/// order. Pure: inputs are consumed, never shared.
pub fn combine(sources: Vec<Vec<PreparedRecord>>) -> UnifiedDataset {
    let total: usize = sources.iter().map(Vec::len).sum();
    let mut records = Vec::with_capacity(total);
    for rows in sources {
        records.extend(rows);
    }

    let distinct: BTreeSet<&str> = records.iter().map(|r| r.region.as_str()).collect();
    let regions: Vec<String> = if distinct.is_empty() {
        vec![NO_DATA_REGION.to_string()]
    } else {
        distinct.into_iter().map(str::to_string).collect()
    };

    UnifiedDataset { records, regions }
}
