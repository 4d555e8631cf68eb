use anyhow::Result;
use eaucorse::Config;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config = Config::from_env();
    info!(
        dataset = %config.dataset_dir.display(),
        years = ?config.years,
        mapbox_token = config.mapbox_token.is_some(),
        "configured"
    );

    // ─── 3) run the pipeline ─────────────────────────────────────────
    eaucorse::run(&config)
}
