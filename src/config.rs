use crate::aggregate::{MonthPolicy, PeriodLabel};
use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 8050;
const DEFAULT_SOURCES: &str = "data/2024.csv=2024,data/2025.csv=2025";

/// One tabular input: where it lives and the provenance label attached to
/// every row it yields.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub sources: Vec<SourceSpec>,
    /// Where to persist the most recent figure as a standalone HTML
    /// document; unset disables the artifact.
    pub snapshot_path: Option<PathBuf>,
    pub month_policy: MonthPolicy,
    pub period_label: PeriodLabel,
}

impl AppConfig {
    /// Read configuration from the environment:
    /// `PORT`, `DATA_SOURCES` (comma-separated `path=label` pairs),
    /// `SNAPSHOT_PATH`, `MONTH_POLICY` (`require`/`all`), `PERIOD_LABEL`
    /// (`month-year`/`year`). Every variable has a default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let port = get("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let sources = parse_sources(
            get("DATA_SOURCES")
                .as_deref()
                .unwrap_or(DEFAULT_SOURCES),
        );

        let snapshot_path = get("SNAPSHOT_PATH")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let month_policy = match get("MONTH_POLICY").as_deref().map(str::trim) {
            Some("all") => MonthPolicy::AllMonths,
            _ => MonthPolicy::RequireSelection,
        };

        let period_label = match get("PERIOD_LABEL").as_deref().map(str::trim) {
            Some("year") => PeriodLabel::YearOnly,
            _ => PeriodLabel::MonthYear,
        };

        Self {
            port,
            sources,
            snapshot_path,
            month_policy,
            period_label,
        }
    }
}

/// Parse `path=label` pairs separated by commas. A pair without `=` falls
/// back to the file stem as its label.
fn parse_sources(raw: &str) -> Vec<SourceSpec> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((path, label)) => SourceSpec {
                path: PathBuf::from(path.trim()),
                label: label.trim().to_string(),
            },
            None => {
                let path = PathBuf::from(entry);
                let label = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| entry.to_string());
                SourceSpec { path, label }
            }
        })
        .collect()
}
