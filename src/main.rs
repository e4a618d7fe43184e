mod cli;
mod config;
mod models;
mod services;

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::config::{catalog::load_catalog, Config, LogFormat};
use crate::models::RunSummary;
use crate::services::{fetcher::HttpFetcher, harvester::Harvester, writer::M3uFileWriter};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "iptv_harvester=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init(),
    }
}

fn log_summary(summary: &RunSummary) {
    for source in &summary.sources {
        if source.abandoned {
            tracing::warn!("{}: abandoned at run deadline", source.name);
        } else if source.errors.is_empty() {
            tracing::info!("{}: {} links ({} new)", source.name, source.parsed, source.added);
        } else {
            tracing::warn!(
                "{}: {} links ({} new), {} error(s): {}",
                source.name,
                source.parsed,
                source.added,
                source.errors.len(),
                source.errors.join("; ")
            );
        }
    }

    for playlist in &summary.output.written {
        tracing::info!("{}: {} links", playlist.category, playlist.count);
    }
    let merged = summary.output.merged.as_ref().map_or(0, |m| m.count);
    tracing::info!(
        "Scraping finished in {}s: {} merged links, {} of {} source(s) failed",
        (summary.finished_at - summary.started_at).num_seconds(),
        merged,
        summary.failed_sources(),
        summary.sources.len()
    );
}

async fn write_report(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(summary)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write run report {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env();

    init_tracing(config.log_format);
    tracing::info!("Starting iptv-harvester v{}", env!("CARGO_PKG_VERSION"));

    let catalog_path = cli
        .catalog
        .clone()
        .or_else(|| config.source_catalog.as_ref().map(PathBuf::from));
    let catalog = load_catalog(catalog_path.as_deref()).await?;

    let ctx = cli.run_context(&config);
    let base_name = ctx.base_name(&config.default_base_name).to_string();

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_dir));
    let writer = M3uFileWriter::new(&output_dir).await?;
    tracing::info!("Writing playlists to {}", writer.output_dir().display());

    let fetcher = HttpFetcher::new(
        &config.user_agent,
        config.fetch_timeout_ms,
        config.max_playlist_size_mb,
    )
    .context("Failed to create HTTP client")?;

    let harvester = Harvester::new(Arc::new(fetcher), &config.fallback_category)
        .with_deadline(config.run_deadline_ms.map(Duration::from_millis));

    let summary = harvester.run(&catalog, &ctx, &writer, &base_name).await;
    log_summary(&summary);

    // Source failures never change the exit status; only a broken report file is reported
    if let Some(path) = &cli.report {
        if let Err(e) = write_report(path, &summary).await {
            tracing::warn!("{:#}", e);
        }
    }

    Ok(())
}
