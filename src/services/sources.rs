//! Source adapters
//!
//! Each adapter fetches one catalog source, parses it in the mode the catalog
//! asks for, and files the entries into the shared index. Failures stay inside
//! the adapter: they end up in the returned report, never in the caller.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::models::{RunContext, SourceMode, SourceReport, SourceSpec};
use crate::services::fetcher::Fetcher;
use crate::services::index::CategoryIndex;
use crate::services::m3u_parser::{M3UParser, ParseMode};

/// Build the URL of one tested-log page from the catalog template
pub fn streamtest_page_url(template: &str, page: u32, filter: &str) -> String {
    template
        .replace("{page}", &page.to_string())
        .replace("{filter}", &urlencoding::encode(filter))
}

/// Runs one catalog source against the index
pub struct SourceAdapter<'a> {
    parser: &'a M3UParser,
    fetcher: &'a dyn Fetcher,
    ctx: &'a RunContext,
}

impl<'a> SourceAdapter<'a> {
    pub fn new(parser: &'a M3UParser, fetcher: &'a dyn Fetcher, ctx: &'a RunContext) -> Self {
        Self {
            parser,
            fetcher,
            ctx,
        }
    }

    /// Fetch, parse and index `spec`. Never fails; errors go to `report`.
    /// Counts are recorded as each fetch completes and outlive a dropped future.
    pub async fn run(
        &self,
        spec: &SourceSpec,
        index: &CategoryIndex,
        report: &Mutex<SourceReport>,
    ) {
        debug!("Running source {} ({})", spec.name, spec.mode);

        match &spec.mode {
            SourceMode::Streamtest => {
                for page in 1..=self.ctx.pages {
                    let url = streamtest_page_url(&spec.url, page, &self.ctx.filter);
                    if let Some(found) = self
                        .fetch_into(&url, ParseMode::LogScrape, index, report)
                        .await
                    {
                        info!("{} page {}: {} links found", spec.name, page, found);
                    }
                }
            }
            SourceMode::Flat { category } => {
                let mode = ParseMode::Flat {
                    category: category.as_str(),
                    filter: "",
                };
                self.fetch_into(&spec.url, mode, index, report).await;
            }
            SourceMode::Filtered { category } => {
                let mode = ParseMode::Flat {
                    category: category.as_str(),
                    filter: &self.ctx.filter,
                };
                self.fetch_into(&spec.url, mode, index, report).await;
            }
            SourceMode::Tagged => {
                self.fetch_into(&spec.url, ParseMode::Tagged, index, report)
                    .await;
            }
        }

        let report = lock(report);
        if report.errors.is_empty() {
            info!(
                "{}: {} links parsed, {} new",
                report.name, report.parsed, report.added
            );
        }
    }

    async fn fetch_into(
        &self,
        url: &str,
        mode: ParseMode<'_>,
        index: &CategoryIndex,
        report: &Mutex<SourceReport>,
    ) -> Option<usize> {
        match self.fetcher.fetch(url).await {
            Ok(text) => {
                let entries: Vec<_> = self.parser.parse(&text, mode).collect();
                let found = entries.len();
                let added = index.extend(entries);

                let mut report = lock(report);
                report.parsed += found;
                report.added += added;
                Some(found)
            }
            Err(e) => {
                let mut report = lock(report);
                warn!("{} error: {}", report.name, e);
                report.errors.push(format!("{}: {}", url, e));
                None
            }
        }
    }
}

fn lock(report: &Mutex<SourceReport>) -> MutexGuard<'_, SourceReport> {
    report.lock().unwrap_or_else(PoisonError::into_inner)
}
