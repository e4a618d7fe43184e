use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Label used for entries scraped from tested-link log pages
pub const STREAMTEST_CATEGORY: &str = "Streamtest";

/// Pseudo-category carrying the merged union of every category
pub const MERGED_CATEGORY: &str = "ALL";

/// One parsed playlist entry: the category it belongs to and its stream URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedEntry {
    pub category: String,
    pub url: String,
}

impl ParsedEntry {
    pub fn new(category: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            url: url.into(),
        }
    }
}

/// How a source's text is turned into entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SourceMode {
    /// Paged tested-link logs; the URL is a template with `{page}` and `{filter}`
    Streamtest,
    /// Every URL in the text goes to a fixed category
    Flat { category: String },
    /// Like `Flat`, but only URLs containing the run's keyword are kept
    Filtered { category: String },
    /// Category comes from the `group-title` of the preceding `#EXTINF` line
    Tagged,
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceMode::Streamtest => write!(f, "streamtest"),
            SourceMode::Flat { category } => write!(f, "flat:{}", category),
            SourceMode::Filtered { category } => write!(f, "filtered:{}", category),
            SourceMode::Tagged => write!(f, "tagged"),
        }
    }
}

/// A remote playlist source from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub mode: SourceMode,
}

impl SourceSpec {
    /// Category this source always files into, if it is fixed by the catalog
    pub fn declared_category(&self) -> Option<&str> {
        match &self.mode {
            SourceMode::Streamtest => Some(STREAMTEST_CATEGORY),
            SourceMode::Flat { category } | SourceMode::Filtered { category } => {
                Some(category.as_str())
            }
            SourceMode::Tagged => None,
        }
    }
}

/// Values fixed at the start of a run and shared read-only by every adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Channel keyword; empty means no filtering
    pub filter: String,
    /// Number of tested-log pages to scrape
    pub pages: u32,
}

impl RunContext {
    pub fn new(filter: impl Into<String>, pages: u32) -> Self {
        Self {
            filter: filter.into().trim().to_string(),
            pages: pages.max(1),
        }
    }

    /// Base name for output artifacts: the keyword, or the default when unfiltered
    pub fn base_name<'a>(&'a self, default: &'a str) -> &'a str {
        if self.filter.is_empty() {
            default
        } else {
            &self.filter
        }
    }
}

/// Outcome of running one source adapter
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub name: String,
    /// URLs the parser produced (before deduplication)
    pub parsed: usize,
    /// URLs that were new to the index
    pub added: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub abandoned: bool,
}

impl SourceReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.abandoned || (!self.errors.is_empty() && self.parsed == 0)
    }
}

/// One category ready for output, URLs already sorted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPlaylist {
    pub name: String,
    pub urls: Vec<String>,
}

/// A playlist file that was written
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenPlaylist {
    pub category: String,
    pub count: usize,
    pub path: PathBuf,
}

/// Result of publishing a reconciled index
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSummary {
    pub written: Vec<WrittenPlaylist>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<WrittenPlaylist>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Everything a run did, for the console and the optional JSON report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub filter: String,
    pub pages: u32,
    pub base_name: String,
    pub sources: Vec<SourceReport>,
    pub output: PublishSummary,
}

impl RunSummary {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_failed()).count()
    }
}
