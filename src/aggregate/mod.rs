use crate::dataset::{month_name, UnifiedDataset};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Fixed non-leap year used to size the day axis. February always gets 28
/// tick positions no matter which years are plotted, so the axis stays
/// stable across multi-year comparisons.
pub const REFERENCE_YEAR: i32 = 2023;

/// User selections narrowing the dataset. Region matches exactly
/// (case-sensitive; source values are already canonical), month matches the
/// derived 1-based month number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartFilters {
    pub region: Option<String>,
    pub month: Option<u32>,
}

/// What to do when no month is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthPolicy {
    /// Prompt the user for a month before showing any data.
    #[default]
    RequireSelection,
    /// Aggregate across every month.
    AllMonths,
}

/// How chart series are labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodLabel {
    /// `"March 2024"` — month name plus the record's own year.
    #[default]
    MonthYear,
    /// `"2024"` — year alone.
    YearOnly,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions {
    pub month_policy: MonthPolicy,
    pub period_label: PeriodLabel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRow {
    pub day_of_month: u32,
    pub period_label: String,
    pub count: u64,
}

/// Result of one aggregation pass. The non-chart variants are ordinary
/// interaction states the renderer turns into messages, never errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    Chart {
        /// Sorted by (period_label, day_of_month).
        rows: Vec<AggregationRow>,
        max_days_in_month: u32,
    },
    /// No month selected under [`MonthPolicy::RequireSelection`].
    AwaitingMonth,
    /// Filtering left nothing; carries the filters for a descriptive message.
    Empty {
        region: Option<String>,
        month: Option<u32>,
    },
}

/// Number of calendar days in `month` for [`REFERENCE_YEAR`].
pub fn days_in_month(month: u32) -> Option<u32> {
    let start = NaiveDate::from_ymd_opt(REFERENCE_YEAR, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(REFERENCE_YEAR + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(REFERENCE_YEAR, month + 1, 1)?
    };
    Some(next.signed_duration_since(start).num_days() as u32)
}

/// Narrow the dataset by the selected filters, bucket the remainder by
/// (day of month, period label), and count per bucket.
///
/// Pure and reentrant: reads the shared dataset, allocates its own state,
/// returns identical output for identical input.
pub fn aggregate(
    dataset: &UnifiedDataset,
    filters: &ChartFilters,
    options: AggregateOptions,
) -> Aggregation {
    let month = match (filters.month, options.month_policy) {
        (Some(m), _) => Some(m),
        (None, MonthPolicy::RequireSelection) => return Aggregation::AwaitingMonth,
        (None, MonthPolicy::AllMonths) => None,
    };

    if let Some(m) = month {
        if !(1..=12).contains(&m) {
            return Aggregation::Empty {
                region: filters.region.clone(),
                month: filters.month,
            };
        }
    }

    let mut buckets: BTreeMap<(String, u32), u64> = BTreeMap::new();
    for record in dataset.records() {
        if let Some(region) = &filters.region {
            if &record.region != region {
                continue;
            }
        }
        if let Some(m) = month {
            if record.month_number != m {
                continue;
            }
        }

        let label = match options.period_label {
            PeriodLabel::MonthYear => format!(
                "{} {}",
                month_name(record.month_number).expect("month_number derived from a valid date"),
                record.year
            ),
            PeriodLabel::YearOnly => record.year.to_string(),
        };
        *buckets.entry((label, record.day_of_month)).or_insert(0) += 1;
    }

    if buckets.is_empty() {
        return Aggregation::Empty {
            region: filters.region.clone(),
            month: filters.month,
        };
    }

    let rows = buckets
        .into_iter()
        .map(|((period_label, day_of_month), count)| AggregationRow {
            day_of_month,
            period_label,
            count,
        })
        .collect();

    // Under AllMonths the axis has no single month to size against.
    let max_days_in_month = month.and_then(days_in_month).unwrap_or(31);

    Aggregation::Chart {
        rows,
        max_days_in_month,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{combine, PreparedRecord};
    use crate::load::dates::parse_day_first;

    fn record(timestamp: &str, region: &str, label: &str) -> PreparedRecord {
        PreparedRecord::from_parts(
            parse_day_first(timestamp).expect("test timestamp"),
            region.to_string(),
            "paid".to_string(),
            label.to_string(),
        )
    }

    fn filters(region: Option<&str>, month: Option<u32>) -> ChartFilters {
        ChartFilters {
            region: region.map(str::to_string),
            month,
        }
    }

    #[test]
    fn single_record_buckets_by_day_and_period() {
        // Scenario: one paid record, North, 05.03.2024.
        let dataset = combine(vec![vec![record("05.03.2024", "North", "2024")]]);
        let result = aggregate(
            &dataset,
            &filters(Some("North"), Some(3)),
            AggregateOptions::default(),
        );

        match result {
            Aggregation::Chart {
                rows,
                max_days_in_month,
            } => {
                assert_eq!(
                    rows,
                    [AggregationRow {
                        day_of_month: 5,
                        period_label: "March 2024".to_string(),
                        count: 1,
                    }]
                );
                assert_eq!(max_days_in_month, 31);
            }
            other => panic!("expected Chart, got {:?}", other),
        }
    }

    #[test]
    fn no_month_selected_awaits_selection() {
        let dataset = combine(vec![vec![record("05.03.2024", "North", "2024")]]);
        let result = aggregate(
            &dataset,
            &filters(Some("North"), None),
            AggregateOptions::default(),
        );
        assert_eq!(result, Aggregation::AwaitingMonth);
    }

    #[test]
    fn all_months_policy_aggregates_without_selection() {
        let dataset = combine(vec![vec![
            record("05.03.2024", "North", "2024"),
            record("09.07.2024", "North", "2024"),
        ]]);
        let options = AggregateOptions {
            month_policy: MonthPolicy::AllMonths,
            ..Default::default()
        };

        match aggregate(&dataset, &filters(None, None), options) {
            Aggregation::Chart {
                rows,
                max_days_in_month,
            } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(max_days_in_month, 31);
            }
            other => panic!("expected Chart, got {:?}", other),
        }
    }

    #[test]
    fn filters_that_match_nothing_name_themselves() {
        let dataset = combine(vec![vec![record("05.03.2024", "North", "2024")]]);
        let result = aggregate(
            &dataset,
            &filters(Some("South"), Some(6)),
            AggregateOptions::default(),
        );
        assert_eq!(
            result,
            Aggregation::Empty {
                region: Some("South".to_string()),
                month: Some(6),
            }
        );
    }

    #[test]
    fn same_day_different_regions_share_a_bucket_without_region_filter() {
        let dataset = combine(vec![vec![
            record("05.03.2024 08:00:00", "North", "2024"),
            record("05.03.2024 19:30:00", "South", "2024"),
        ]]);

        match aggregate(&dataset, &filters(None, Some(3)), AggregateOptions::default()) {
            Aggregation::Chart { rows, .. } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].count, 2);
                assert_eq!(rows[0].period_label, "March 2024");
            }
            other => panic!("expected Chart, got {:?}", other),
        }
    }

    #[test]
    fn years_become_separate_periods() {
        let dataset = combine(vec![
            vec![record("05.03.2024", "North", "2024")],
            vec![record("05.03.2025", "North", "2025")],
        ]);

        match aggregate(&dataset, &filters(None, Some(3)), AggregateOptions::default()) {
            Aggregation::Chart { rows, .. } => {
                let labels: Vec<&str> = rows.iter().map(|r| r.period_label.as_str()).collect();
                assert_eq!(labels, ["March 2024", "March 2025"]);
            }
            other => panic!("expected Chart, got {:?}", other),
        }
    }

    #[test]
    fn year_only_labels_are_supported() {
        let dataset = combine(vec![vec![record("05.03.2024", "North", "2024")]]);
        let options = AggregateOptions {
            period_label: PeriodLabel::YearOnly,
            ..Default::default()
        };

        match aggregate(&dataset, &filters(None, Some(3)), options) {
            Aggregation::Chart { rows, .. } => assert_eq!(rows[0].period_label, "2024"),
            other => panic!("expected Chart, got {:?}", other),
        }
    }

    #[test]
    fn counting_invariant_holds() {
        let rows = vec![
            record("01.06.2024 09:00:00", "North", "2024"),
            record("01.06.2024 10:00:00", "North", "2024"),
            record("02.06.2024", "North", "2024"),
            record("02.06.2024", "South", "2024"),
            record("15.07.2024", "North", "2024"),
            record("01.06.2025", "North", "2025"),
        ];
        let dataset = combine(vec![rows.clone()]);
        let region = Some("North");
        let month = Some(6);

        let expected = rows
            .iter()
            .filter(|r| r.region == "North" && r.month_number == 6)
            .count() as u64;

        match aggregate(&dataset, &filters(region, month), AggregateOptions::default()) {
            Aggregation::Chart { rows, .. } => {
                let total: u64 = rows.iter().map(|r| r.count).sum();
                assert_eq!(total, expected);
            }
            other => panic!("expected Chart, got {:?}", other),
        }
    }

    #[test]
    fn aggregation_is_idempotent() {
        let dataset = combine(vec![vec![
            record("05.03.2024", "North", "2024"),
            record("06.03.2024", "South", "2024"),
            record("05.03.2025", "North", "2025"),
        ]]);
        let f = filters(None, Some(3));

        let first = aggregate(&dataset, &f, AggregateOptions::default());
        let second = aggregate(&dataset, &f, AggregateOptions::default());
        assert_eq!(first, second);
    }

    #[test]
    fn reference_year_keeps_february_at_28_days() {
        assert_eq!(days_in_month(2), Some(28));
        assert_eq!(days_in_month(4), Some(30));
        assert_eq!(days_in_month(1), Some(31));
        assert_eq!(days_in_month(12), Some(31));
        assert_eq!(days_in_month(0), None);
        assert_eq!(days_in_month(13), None);
    }

    #[test]
    fn out_of_range_month_filter_is_empty_not_panic() {
        let dataset = combine(vec![vec![record("05.03.2024", "North", "2024")]]);
        let result = aggregate(&dataset, &filters(None, Some(13)), AggregateOptions::default());
        assert!(matches!(result, Aggregation::Empty { .. }));
    }
}
