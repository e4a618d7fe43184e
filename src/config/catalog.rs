//! Source catalog
//!
//! The list of remote playlists a run pulls from. Parsing and merging never
//! look at specific sources, so the list can be swapped for a JSON file of the
//! same shape:
//!
//! ```text
//! [
//!   {"name": "iptv-org sports", "url": "https://.../sports.m3u", "mode": "filtered", "category": "Sports"},
//!   {"name": "iptv-org india", "url": "https://.../in.m3u", "mode": "tagged"}
//! ]
//! ```

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::models::{SourceMode, SourceSpec};

const IPTV_ORG_CHANNELS: &str = "https://raw.githubusercontent.com/iptv-org/iptv/master/channels";

fn source(name: &str, url: String, mode: SourceMode) -> SourceSpec {
    SourceSpec {
        name: name.to_string(),
        url,
        mode,
    }
}

fn filtered(name: &str, file: &str, category: &str) -> SourceSpec {
    source(
        name,
        format!("{}/{}", IPTV_ORG_CHANNELS, file),
        SourceMode::Filtered {
            category: category.to_string(),
        },
    )
}

/// Built-in catalog: streamtest.in logs, the iptv-org India list and its
/// per-category lists (keyword-filtered), plus the grouped India country list.
pub fn default_catalog() -> Vec<SourceSpec> {
    vec![
        source(
            "streamtest.in",
            "https://streamtest.in/logs/page/{page}?filter={filter}&is_public=true".to_string(),
            SourceMode::Streamtest,
        ),
        filtered("iptv-org india", "in.m3u", "General"),
        filtered("iptv-org movies", "movies.m3u", "Movies"),
        filtered("iptv-org news", "news.m3u", "News"),
        filtered("iptv-org entertainment", "entertainment.m3u", "Entertainment"),
        filtered("iptv-org sports", "sports.m3u", "Sports"),
        source(
            "iptv-org india (grouped)",
            "https://iptv-org.github.io/iptv/countries/in.m3u".to_string(),
            SourceMode::Tagged,
        ),
    ]
}

/// Parse and sanity-check a catalog document
pub fn parse_catalog(json: &str) -> Result<Vec<SourceSpec>> {
    let catalog: Vec<SourceSpec> =
        serde_json::from_str(json).context("Invalid source catalog JSON")?;

    for spec in &catalog {
        if !(spec.url.starts_with("http://") || spec.url.starts_with("https://")) {
            bail!("Source {:?} has a non-HTTP URL: {}", spec.name, spec.url);
        }
        if spec.mode == SourceMode::Streamtest && !spec.url.contains("{page}") {
            bail!("Source {:?} is paged but its URL has no {{page}} placeholder", spec.name);
        }
    }

    Ok(catalog)
}

/// Load the catalog from `path`, or the built-in one when no path is given
pub async fn load_catalog(path: Option<&Path>) -> Result<Vec<SourceSpec>> {
    let Some(path) = path else {
        return Ok(default_catalog());
    };

    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read source catalog {}", path.display()))?;
    let catalog = parse_catalog(&json)?;

    tracing::info!("Loaded {} source(s) from {}", catalog.len(), path.display());
    Ok(catalog)
}
