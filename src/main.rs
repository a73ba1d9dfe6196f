use anyhow::Result;
use appdash::{
    aggregate::AggregateOptions,
    config::AppConfig,
    dataset,
    load::{self, SourceOutcome},
    server::{self, AppState},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config = AppConfig::from_env();
    info!(
        port = config.port,
        sources = config.sources.len(),
        "configuration loaded"
    );

    // ─── 3) load sources ─────────────────────────────────────────────
    let mut prepared = Vec::with_capacity(config.sources.len());
    let mut startup_errors = Vec::new();

    for source in &config.sources {
        match load::load_source(&source.path, &source.label) {
            SourceOutcome::Loaded(rows) => {
                if rows.is_empty() {
                    warn!(
                        path = %source.path.display(),
                        label = %source.label,
                        "source yielded no paid records"
                    );
                }
                prepared.push(rows);
            }
            SourceOutcome::Unavailable { reason } => {
                warn!(
                    path = %source.path.display(),
                    %reason,
                    "source unavailable; continuing without it"
                );
                prepared.push(Vec::new());
            }
            SourceOutcome::Malformed { missing_columns } => {
                let message = format!(
                    "{}: missing required columns: {}",
                    source.path.display(),
                    missing_columns.join(", ")
                );
                error!("{}", message);
                startup_errors.push(message);
            }
        }
    }

    // ─── 4) combine into the immutable dataset ───────────────────────
    let dataset = dataset::combine(prepared);
    if dataset.is_empty() {
        warn!("no paid records loaded; dashboard starts degraded");
    }
    info!(
        records = dataset.len(),
        regions = dataset.available_regions().len(),
        "dataset ready"
    );

    // ─── 5) serve ────────────────────────────────────────────────────
    let state = Arc::new(AppState {
        dataset,
        startup_errors,
        options: AggregateOptions {
            month_policy: config.month_policy,
            period_label: config.period_label,
        },
        snapshot_path: config.snapshot_path.clone(),
    });

    server::run(state, config.port).await;
    Ok(())
}
