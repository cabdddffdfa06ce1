//! AI Tools Monitor: binary entrypoint
//! Loads config, wires adapters into the aggregator and runs the periodic loop
//! until Ctrl-C. `--once` runs a single pass and prints the batch plus its
//! engagement summary as JSON.

use ai_tools_monitor::ingest::sink::{JsonFileSink, RecordSink};
use ai_tools_monitor::metrics::Metrics;
use ai_tools_monitor::scoring::engagement_summary;
use ai_tools_monitor::{aggregator_from_config, load_config_default};
use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` overrides the default filter; `MONITOR_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ai_tools_monitor=info,warn"));

    let json = std::env::var("MONITOR_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

/// Serve `/metrics` on `METRICS_ADDR` (e.g. `0.0.0.0:9100`) when set.
async fn spawn_metrics_server(interval_secs: u64) -> anyhow::Result<()> {
    let Ok(addr) = std::env::var("METRICS_ADDR") else {
        return Ok(());
    };
    let metrics = Metrics::init(interval_secs)?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding metrics listener on {addr}"))?;
    tracing::info!(%addr, "serving /metrics");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, metrics.router()).await {
            tracing::error!(error = ?e, "metrics server stopped");
        }
    });
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default().context("loading monitor config")?;
    spawn_metrics_server(cfg.interval_secs).await?;

    let aggregator = aggregator_from_config(&cfg);
    if aggregator.adapters().is_empty() {
        tracing::warn!("no adapters configured; every cycle will be empty");
    }

    if std::env::args().any(|a| a == "--once") {
        let report = aggregator.fetch_all_report().await;
        aggregator.shutdown().await;
        let summary = serde_json::json!({
            "engagement": engagement_summary(&report.records, 10),
            "report": &report,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received interrupt signal, shutting down");
                cancel.cancel();
            }
        });
    }

    let sink = JsonFileSink::new(&cfg.output_dir);
    aggregator
        .run(cfg.run_options(), &cancel, Some(&sink as &dyn RecordSink))
        .await;
    Ok(())
}
