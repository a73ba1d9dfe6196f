pub mod dates;

use crate::dataset::PreparedRecord;
use csv::{ReaderBuilder, StringRecord};
use std::{fs::File, io::BufReader, path::Path};
use tracing::{debug, info};

pub const TIMESTAMP_COLUMN: &str = "APPLICATION DATE";
pub const REGION_COLUMN: &str = "REGION";
pub const STATUS_COLUMN: &str = "Status";

/// The only status value that survives loading, after trim + lowercase.
pub const PAID_STATUS: &str = "paid";

/// What became of one source file. File absence and schema problems are
/// ordinary variants here, not errors; the caller decides how each affects
/// startup.
#[derive(Debug)]
pub enum SourceOutcome {
    /// Rows that parsed, carried all required fields, and are paid.
    Loaded(Vec<PreparedRecord>),
    /// The file could not be opened or read. Startup continues without it.
    Unavailable { reason: String },
    /// The file was readable but lacks required columns. Distinct from
    /// "no data"; surfaced through the startup-error display path.
    Malformed { missing_columns: Vec<String> },
}

struct RequiredColumns {
    timestamp: usize,
    region: usize,
    status: usize,
}

/// Resolve required column indices once, matching headers trimmed and
/// case-insensitively.
fn resolve_columns(headers: &StringRecord) -> Result<RequiredColumns, Vec<String>> {
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    let timestamp = find(TIMESTAMP_COLUMN);
    let region = find(REGION_COLUMN);
    let status = find(STATUS_COLUMN);

    match (timestamp, region, status) {
        (Some(timestamp), Some(region), Some(status)) => Ok(RequiredColumns {
            timestamp,
            region,
            status,
        }),
        _ => {
            let mut missing = Vec::new();
            if timestamp.is_none() {
                missing.push(TIMESTAMP_COLUMN.to_string());
            }
            if region.is_none() {
                missing.push(REGION_COLUMN.to_string());
            }
            if status.is_none() {
                missing.push(STATUS_COLUMN.to_string());
            }
            Err(missing)
        }
    }
}

/// Load one CSV source and prepare its rows.
///
/// Per-row failures (unparseable timestamp, empty region or status) drop the
/// row; non-paid rows are filtered out. `label` tags every surviving row
/// with its source dataset.
pub fn load_source(path: &Path, label: &str) -> SourceOutcome {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            return SourceOutcome::Unavailable {
                reason: e.to_string(),
            }
        }
    };

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            return SourceOutcome::Unavailable {
                reason: format!("could not read header row: {}", e),
            }
        }
    };

    let columns = match resolve_columns(&headers) {
        Ok(c) => c,
        Err(missing_columns) => return SourceOutcome::Malformed { missing_columns },
    };

    let mut records = Vec::new();
    let mut dropped = 0usize;
    let mut unpaid = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(record = idx, "skipping unreadable row: {}", e);
                dropped += 1;
                continue;
            }
        };

        let raw_timestamp = row.get(columns.timestamp).unwrap_or("");
        let raw_region = row.get(columns.region).unwrap_or("");
        let raw_status = row.get(columns.status).unwrap_or("");

        let timestamp = match dates::parse_day_first(raw_timestamp) {
            Some(ts) => ts,
            None => {
                debug!(record = idx, value = raw_timestamp, "dropping row with unparseable timestamp");
                dropped += 1;
                continue;
            }
        };

        let region = raw_region.trim();
        let status = raw_status.trim().to_lowercase();
        if region.is_empty() || status.is_empty() {
            dropped += 1;
            continue;
        }

        if status != PAID_STATUS {
            unpaid += 1;
            continue;
        }

        records.push(PreparedRecord::from_parts(
            timestamp,
            region.to_string(),
            status,
            label.to_string(),
        ));
    }

    info!(
        path = %path.display(),
        label,
        loaded = records.len(),
        dropped,
        unpaid,
        "loaded source"
    );

    SourceOutcome::Loaded(records)
}
