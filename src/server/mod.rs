use crate::aggregate::{aggregate, AggregateOptions, ChartFilters};
use crate::chart;
use crate::dataset::{UnifiedDataset, MONTH_NAMES};
use serde::Deserialize;
use serde_json::json;
use std::{convert::Infallible, path::PathBuf, sync::Arc};
use tracing::{info, warn};
use warp::{http::StatusCode, reject::Rejection, reply::Reply, Filter};

/// Read-only context shared by every request handler. The dataset is built
/// once at startup and never mutated, so handlers run concurrently without
/// locking.
pub struct AppState {
    pub dataset: UnifiedDataset,
    /// Malformed-source descriptions collected at startup. Non-empty means
    /// the dashboard shows the startup-failure page instead of charts.
    pub startup_errors: Vec<String>,
    pub options: AggregateOptions,
    /// When set, every rendered figure is also persisted here as a
    /// standalone HTML document (best effort).
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ChartQuery {
    region: Option<String>,
    month: Option<u32>,
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let with_state = warp::any().map(move || Arc::clone(&state));

    let index = warp::path::end()
        .and(warp::get())
        .and(with_state.clone())
        .and_then(index_page);

    let health = warp::path("health").and(warp::get()).and_then(health_check);

    let regions = warp::path!("api" / "regions")
        .and(warp::get())
        .and(with_state.clone())
        .and_then(regions_handler);

    let months = warp::path!("api" / "months")
        .and(warp::get())
        .and_then(months_handler);

    let chart = warp::path!("api" / "chart")
        .and(warp::get())
        .and(warp::query::<ChartQuery>())
        .and(with_state)
        .and_then(chart_handler);

    index.or(health).or(regions).or(months).or(chart)
}

/// Bind the dashboard to `0.0.0.0:port` and serve until shutdown.
pub async fn run(state: Arc<AppState>, port: u16) {
    let filter = routes(state).recover(handle_rejection);
    info!("dashboard listening on http://0.0.0.0:{}", port);
    warp::serve(filter).run(([0, 0, 0, 0], port)).await;
}

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&json!({
        "status": "healthy",
        "service": "appdash"
    })))
}

async fn index_page(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    if state.startup_errors.is_empty() {
        Ok(warp::reply::html(DASHBOARD_HTML.to_string()))
    } else {
        Ok(warp::reply::html(startup_error_page(&state.startup_errors)))
    }
}

async fn regions_handler(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&state.dataset.available_regions()))
}

async fn months_handler() -> Result<impl Reply, Rejection> {
    let months: Vec<_> = MONTH_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| json!({ "label": name, "value": i + 1 }))
        .collect();
    Ok(warp::reply::json(&months))
}

/// One aggregation-and-render cycle. Invoked on every selection change; the
/// previous chart is replaced entirely on the client.
async fn chart_handler(query: ChartQuery, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    if !state.startup_errors.is_empty() {
        let body = json!({
            "error": "startup failure",
            "details": state.startup_errors,
        });
        return Ok(warp::reply::with_status(
            warp::reply::json(&body),
            StatusCode::SERVICE_UNAVAILABLE,
        ));
    }

    // An unselected dropdown arrives as an absent or empty parameter.
    let filters = ChartFilters {
        region: query.region.filter(|r| !r.is_empty()),
        month: query.month,
    };

    let figure = if state.dataset.is_empty() {
        chart::message_figure(chart::NO_DATA_LOADED)
    } else {
        let aggregation = aggregate(&state.dataset, &filters, state.options);
        chart::figure(&aggregation, &filters)
    };

    if let Some(path) = &state.snapshot_path {
        if let Err(e) = chart::snapshot(&figure, path) {
            warn!("chart snapshot failed: {:#}", e);
        }
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&figure),
        StatusCode::OK,
    ))
}

/// Map rejections (unknown paths, malformed query strings) to small JSON
/// bodies instead of warp's default plain-text replies.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found")
    } else {
        (StatusCode::BAD_REQUEST, "invalid request")
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "error": message })),
        code,
    ))
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn startup_error_page(errors: &[String]) -> String {
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>\n", escape_html(e)))
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Application Analytics Dashboard</title></head>
<body style="font-family: sans-serif; max-width: 48rem; margin: 3rem auto;">
<h1>Startup failed</h1>
<p>The dashboard could not start because the following sources are malformed:</p>
<ul>
{items}</ul>
<p>Fix the source files and restart the service.</p>
</body>
</html>
"#
    )
}

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Application Analytics Dashboard</title>
<script src="https://cdn.plot.ly/plotly-2.32.0.min.js"></script>
<style>
body { font-family: sans-serif; max-width: 64rem; margin: 1.5rem auto; padding: 0 1rem; }
h1 { text-align: center; }
p.subtitle { text-align: center; color: #666; }
.filters { display: flex; gap: 2rem; justify-content: center; margin-bottom: 1rem; }
.filters label { font-weight: bold; }
select { margin-left: 0.5rem; min-width: 14rem; padding: 0.25rem; }
#chart { height: 600px; }
footer { text-align: center; color: #888; font-size: 0.85rem; margin-top: 1rem; }
</style>
</head>
<body>
<h1>Application Analytics Dashboard</h1>
<p class="subtitle">Compare paid applications by day across different regions and time periods</p>
<div class="filters">
  <label>Select Region:
    <select id="region"><option value="">Choose a region...</option></select>
  </label>
  <label>Select Month:
    <select id="month"><option value="">Choose a month...</option></select>
  </label>
</div>
<div id="chart"></div>
<footer>Daily paid-application counts compared across source datasets</footer>
<script>
async function loadOptions() {
  const regions = await (await fetch('/api/regions')).json();
  const regionSelect = document.getElementById('region');
  for (const region of regions) regionSelect.add(new Option(region, region));

  const months = await (await fetch('/api/months')).json();
  const monthSelect = document.getElementById('month');
  for (const month of months) monthSelect.add(new Option(month.label, month.value));
}

async function refresh() {
  const params = new URLSearchParams();
  const region = document.getElementById('region').value;
  const month = document.getElementById('month').value;
  if (region) params.set('region', region);
  if (month) params.set('month', month);

  const response = await fetch('/api/chart?' + params.toString());
  const figure = await response.json();
  if (figure.error) return;
  Plotly.newPlot('chart', figure.data, figure.layout, {responsive: true});
}

document.getElementById('region').addEventListener('change', refresh);
document.getElementById('month').addEventListener('change', refresh);
loadOptions().then(refresh);
</script>
</body>
</html>
"#;
