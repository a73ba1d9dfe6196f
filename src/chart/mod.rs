use crate::aggregate::{Aggregation, ChartFilters};
use crate::dataset::month_name;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::{fs, path::Path};

/// Shown when the dataset loaded zero paid records anywhere.
pub const NO_DATA_LOADED: &str = "No data available. Please check the source files.";
/// Shown while the month selector is empty.
pub const AWAITING_MONTH: &str = "Please select a month to display data.";

/// A figure with no traces whose title carries an explanatory message. The
/// client renders it through the same plot call as a real chart.
pub fn message_figure(text: &str) -> Value {
    json!({
        "data": [],
        "layout": {
            "title": { "text": text, "font": { "size": 18 } },
            "plot_bgcolor": "white",
            "font": { "size": 14 },
            "height": 500,
        }
    })
}

fn empty_message(region: Option<&str>, month: Option<u32>) -> String {
    let mut message = "No data available for the selected filters".to_string();
    let month = month.and_then(month_name);
    match (region, month) {
        (Some(region), Some(month)) => {
            message.push_str(&format!(": {} in {}", region, month));
        }
        (Some(region), None) => message.push_str(&format!(": {}", region)),
        (None, Some(month)) => message.push_str(&format!(": {}", month)),
        (None, None) => {}
    }
    message
}

fn chart_title(filters: &ChartFilters) -> String {
    let mut title = "Daily Paid Applications".to_string();
    if let Some(name) = filters.month.and_then(month_name) {
        title.push_str(&format!(": {}", name));
    }
    if let Some(region) = &filters.region {
        title.push_str(&format!(" - {}", region));
    }
    title
}

/// Build the plotly-shaped figure for one aggregation outcome: one
/// line+marker trace per period label, day of month on a fixed 1..max_days
/// axis. The non-chart outcomes become message figures.
pub fn figure(aggregation: &Aggregation, filters: &ChartFilters) -> Value {
    let (rows, max_days) = match aggregation {
        Aggregation::AwaitingMonth => return message_figure(AWAITING_MONTH),
        Aggregation::Empty { region, month } => {
            return message_figure(&empty_message(region.as_deref(), *month));
        }
        Aggregation::Chart {
            rows,
            max_days_in_month,
        } => (rows, *max_days_in_month),
    };

    // Rows arrive sorted by (period label, day); fold consecutive rows with
    // the same label into one series.
    let mut series: Vec<(&str, Vec<u32>, Vec<u64>)> = Vec::new();
    for row in rows {
        if series
            .last()
            .map_or(true, |(label, _, _)| *label != row.period_label)
        {
            series.push((row.period_label.as_str(), Vec::new(), Vec::new()));
        }
        let entry = series.last_mut().expect("series was just extended");
        entry.1.push(row.day_of_month);
        entry.2.push(row.count);
    }

    let traces: Vec<Value> = series
        .into_iter()
        .map(|(label, days, counts)| {
            json!({
                "type": "scatter",
                "mode": "lines+markers",
                "name": label,
                "x": days,
                "y": counts,
            })
        })
        .collect();

    json!({
        "data": traces,
        "layout": {
            "title": { "text": chart_title(filters), "font": { "size": 16 } },
            "xaxis": {
                "title": { "text": "Day of Month" },
                "tickmode": "linear",
                "dtick": 1,
                "range": [1, max_days],
                "showgrid": true,
                "gridcolor": "lightgray",
            },
            "yaxis": {
                "title": { "text": "Total Paid Applications" },
                "showgrid": true,
                "gridcolor": "lightgray",
            },
            "legend": { "title": { "text": "Period" } },
            "hovermode": "x unified",
            "plot_bgcolor": "white",
            "font": { "size": 12 },
            "height": 500,
        }
    })
}

/// Persist the most recently rendered figure as a standalone interactive
/// HTML document. Best-effort side artifact; callers log failures and move
/// on.
pub fn snapshot(figure: &Value, path: &Path) -> Result<()> {
    let payload =
        serde_json::to_string(figure).context("serializing figure for chart snapshot")?;
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Application Analytics Snapshot</title>
<script src="https://cdn.plot.ly/plotly-2.32.0.min.js"></script>
</head>
<body>
<div id="chart"></div>
<script>
const figure = {payload};
Plotly.newPlot("chart", figure.data, figure.layout, {{responsive: true}});
</script>
</body>
</html>
"#
    );

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating snapshot directory {}", parent.display()))?;
    }
    fs::write(path, html)
        .with_context(|| format!("writing chart snapshot to {}", path.display()))?;
    Ok(())
}
