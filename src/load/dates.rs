use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const DAY_FIRST_DATETIME: &str = "%d.%m.%Y %H:%M:%S";
const DAY_FIRST_DATE: &str = "%d.%m.%Y";

/// Parse an application timestamp using the day-first convention
/// (`day.month.year`, optionally followed by `hour:minute:second`).
/// Returns `None` for anything that does not parse; callers drop the row.
pub fn parse_day_first(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, DAY_FIRST_DATETIME) {
        return Some(dt);
    }

    NaiveDate::parse_from_str(value, DAY_FIRST_DATE)
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}
