//! Run orchestration
//!
//! Every catalog source runs concurrently against one `CategoryIndex`. Once
//! they are done (or the optional deadline passes) the index is reconciled and
//! handed to the sink: one playlist per category plus the merged `ALL` list.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::{
    PublishSummary, RunContext, RunSummary, SourceReport, SourceSpec, WrittenPlaylist,
    MERGED_CATEGORY,
};
use crate::services::fetcher::Fetcher;
use crate::services::index::CategoryIndex;
use crate::services::m3u_parser::M3UParser;
use crate::services::reconciler::{reconcile, Reconciled};
use crate::services::sources::SourceAdapter;
use crate::services::writer::PlaylistSink;

pub struct Harvester {
    parser: M3UParser,
    fetcher: Arc<dyn Fetcher>,
    deadline: Option<Duration>,
}

impl Harvester {
    pub fn new(fetcher: Arc<dyn Fetcher>, fallback_category: &str) -> Self {
        Self {
            parser: M3UParser::new(fallback_category),
            fetcher,
            deadline: None,
        }
    }

    /// Abandon sources still running after `deadline` and publish what was collected
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Run every source into `index`. Reports come back in catalog order.
    pub async fn collect(
        &self,
        catalog: &[SourceSpec],
        ctx: &RunContext,
        index: &CategoryIndex,
    ) -> Vec<SourceReport> {
        let adapter = SourceAdapter::new(&self.parser, self.fetcher.as_ref(), ctx);
        let adapter = &adapter;
        let progress: Vec<Mutex<SourceReport>> = catalog
            .iter()
            .map(|spec| Mutex::new(SourceReport::new(&spec.name)))
            .collect();
        let progress = &progress;

        let mut pending: FuturesUnordered<_> = catalog
            .iter()
            .enumerate()
            .map(move |(position, spec)| async move {
                adapter.run(spec, index, &progress[position]).await;
                position
            })
            .collect();

        let mut finished = vec![false; catalog.len()];
        let deadline = self.deadline.map(|d| tokio::time::Instant::now() + d);

        loop {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, pending.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!("Run deadline reached, abandoning {} source(s)", pending.len());
                        break;
                    }
                },
                None => pending.next().await,
            };

            match next {
                Some(position) => finished[position] = true,
                None => break,
            }
        }
        // Dropping the remaining futures cancels their in-flight fetches; the
        // counts they already recorded stay in `progress`
        drop(pending);

        progress
            .iter()
            .zip(finished)
            .map(|(slot, done)| {
                let mut report = slot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                report.abandoned = !done;
                report
            })
            .collect()
    }

    /// Full run: collect, reconcile, publish
    pub async fn run(
        &self,
        catalog: &[SourceSpec],
        ctx: &RunContext,
        sink: &dyn PlaylistSink,
        base_name: &str,
    ) -> RunSummary {
        let started_at = chrono::Utc::now();
        info!(
            "Harvesting {} source(s) (filter: {:?}, pages: {})",
            catalog.len(),
            ctx.filter,
            ctx.pages
        );

        let index = CategoryIndex::new();
        let sources = self.collect(catalog, ctx, &index).await;

        if index.is_empty() {
            warn!("No links collected from any source");
        } else {
            info!(
                "Collected {} links in {} categories",
                index.total_entries(),
                index.len()
            );
            debug!("Categories: {}", index.categories().join(", "));
        }

        let declared: Vec<String> = catalog
            .iter()
            .filter_map(|spec| spec.declared_category())
            .map(str::to_string)
            .collect();
        let reconciled = reconcile(&index, &declared);
        let output = publish(&reconciled, sink, base_name).await;

        RunSummary {
            started_at,
            finished_at: chrono::Utc::now(),
            filter: ctx.filter.clone(),
            pages: ctx.pages,
            base_name: base_name.to_string(),
            sources,
            output,
        }
    }
}

/// Hand each non-empty playlist to the sink. A failed write is logged and the
/// remaining playlists are still written.
pub async fn publish(
    reconciled: &Reconciled,
    sink: &dyn PlaylistSink,
    base_name: &str,
) -> PublishSummary {
    let mut summary = PublishSummary {
        skipped: reconciled.skipped.clone(),
        ..Default::default()
    };

    for name in &reconciled.skipped {
        info!("No links collected for {}, nothing written", name);
    }

    for playlist in &reconciled.categories {
        if playlist.urls.is_empty() {
            summary.skipped.push(playlist.name.clone());
            continue;
        }
        if playlist.name == MERGED_CATEGORY {
            warn!("Category {:?} shares its file with the merged playlist", MERGED_CATEGORY);
        }

        match sink.write(&playlist.name, &playlist.urls, base_name).await {
            Ok(path) => {
                info!("Saved {} links → {}", playlist.urls.len(), path.display());
                summary.written.push(WrittenPlaylist {
                    category: playlist.name.clone(),
                    count: playlist.urls.len(),
                    path,
                });
            }
            Err(e) => {
                warn!("Failed to save {}: {:#}", playlist.name, e);
                summary.failed.push(playlist.name.clone());
            }
        }
    }

    if reconciled.merged.is_empty() {
        info!("No links collected at all, merged playlist not written");
        return summary;
    }

    match sink.write(MERGED_CATEGORY, &reconciled.merged, base_name).await {
        Ok(path) => {
            info!(
                "Saved merged playlist ({} links) → {}",
                reconciled.merged.len(),
                path.display()
            );
            summary.merged = Some(WrittenPlaylist {
                category: MERGED_CATEGORY.to_string(),
                count: reconciled.merged.len(),
                path,
            });
        }
        Err(e) => {
            warn!("Failed to save merged playlist: {:#}", e);
            summary.failed.push(MERGED_CATEGORY.to_string());
        }
    }

    summary
}
