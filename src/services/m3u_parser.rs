use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::models::{ParsedEntry, STREAMTEST_CATEGORY};

const EXTINF_PREFIX: &str = "#EXTINF";

lazy_static! {
    /// Regex to normalize multiple whitespaces into single space
    static ref MULTI_SPACE_REGEX: Regex = Regex::new(r"\s{2,}").unwrap();
    /// Regex to parse EXTINF attributes (tvg-id="...", group-title="...", etc)
    static ref ATTR_REGEX: Regex = Regex::new(r#"(\w+(?:-\w+)*)="([^"]*)""#).unwrap();

    /// Any http(s) token; quotes and angle brackets end the URL
    static ref URL_REGEX: Regex = Regex::new(r#"(?i)https?://[^\s"'<>]+"#).unwrap();
}

/// What a single playlist line turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `#EXTINF` line, with its normalized `group-title` when present
    Metadata(Option<String>),
    /// Stream URL line
    Url(&'a str),
    /// Header, other directives, blank or unrecognized lines
    Other,
}

/// How source text should be read
#[derive(Debug, Clone, Copy)]
pub enum ParseMode<'a> {
    /// URL tokens anywhere in the text, all in one category
    Flat { category: &'a str, filter: &'a str },
    /// `#EXTINF group-title` decides the category of the following URLs
    Tagged,
    /// Playlist links scraped out of a tested-log HTML page
    LogScrape,
}

/// Normalize text: trim and collapse multiple spaces into single space
fn normalize_text(text: &str) -> String {
    let trimmed = text.trim();
    MULTI_SPACE_REGEX.replace_all(trimmed, " ").to_string()
}

/// Position of the comma separating the EXTINF header from the title,
/// ignoring commas inside quoted attribute values
fn find_title_separator(content: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (idx, c) in content.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Parse the attributes of an EXTINF line
/// Format: #EXTINF:duration tvg-id="..." tvg-logo="..." group-title="...",Title
fn parse_extinf(line: &str) -> Option<HashMap<String, String>> {
    let content = line.strip_prefix(EXTINF_PREFIX)?;

    let header = match find_title_separator(content) {
        Some(idx) => &content[..idx],
        None => content,
    };

    let mut attributes = HashMap::new();
    for caps in ATTR_REGEX.captures_iter(header) {
        let key = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        let value = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        attributes.insert(key, value);
    }

    Some(attributes)
}

fn is_http_url(line: &str) -> bool {
    let has_prefix = |prefix: &str| {
        line.get(..prefix.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
    };
    line.len() > "http://".len() && (has_prefix("http://") || has_prefix("https://"))
}

/// Classify one raw line. Never fails; anything unrecognized is `Other`.
pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();

    if trimmed.starts_with(EXTINF_PREFIX) {
        let group = parse_extinf(trimmed)
            .and_then(|mut attrs| attrs.remove("group-title"))
            .map(|g| normalize_text(&g));
        return LineKind::Metadata(group);
    }

    if is_http_url(trimmed) {
        return LineKind::Url(trimmed);
    }

    LineKind::Other
}

/// Lazy tagged-mode scan: tracks the current category across lines
pub struct TaggedEntries<'a> {
    lines: std::str::Lines<'a>,
    current: Option<String>,
    fallback: &'a str,
}

impl<'a> TaggedEntries<'a> {
    fn new(text: &'a str, fallback: &'a str) -> Self {
        Self {
            lines: text.lines(),
            current: None,
            fallback,
        }
    }
}

impl Iterator for TaggedEntries<'_> {
    type Item = ParsedEntry;

    fn next(&mut self) -> Option<ParsedEntry> {
        for line in self.lines.by_ref() {
            match classify_line(line) {
                // An empty group-title collapses to the fallback category
                LineKind::Metadata(Some(group)) => {
                    self.current = if group.is_empty() { None } else { Some(group) };
                }
                LineKind::Metadata(None) | LineKind::Other => {}
                LineKind::Url(url) => {
                    let category = self.current.as_deref().unwrap_or(self.fallback);
                    return Some(ParsedEntry::new(category, url));
                }
            }
        }
        None
    }
}

/// Flat-mode scan. An empty filter admits every URL; otherwise the filter must
/// occur in the URL, ignoring case.
pub fn parse_flat<'a>(
    text: &'a str,
    category: &'a str,
    filter: &str,
) -> impl Iterator<Item = ParsedEntry> + 'a {
    let needle = filter.trim().to_lowercase();
    URL_REGEX
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(move |url| needle.is_empty() || url.to_lowercase().contains(&needle))
        .map(move |url| ParsedEntry::new(category, url))
}

/// Log-scrape scan: only playlist links, surrounding markup ignored
pub fn parse_log_page(text: &str) -> impl Iterator<Item = ParsedEntry> + '_ {
    URL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().replace("&amp;", "&"))
        .filter(|url| is_playlist_link(url))
        .map(|url| ParsedEntry::new(STREAMTEST_CATEGORY, url))
}

/// True when the path (query excluded) ends in `.m3u8` or `.m3u`
fn is_playlist_link(url: &str) -> bool {
    let path = url.split('?').next().unwrap_or(url).to_ascii_lowercase();
    path.ends_with(".m3u8") || path.ends_with(".m3u")
}

/// Playlist text parser. Total: malformed input only ever yields fewer entries.
#[derive(Debug, Clone)]
pub struct M3UParser {
    fallback_category: String,
}

impl M3UParser {
    /// Create a parser that files unlabeled tagged URLs under `fallback_category`
    pub fn new(fallback_category: &str) -> Self {
        Self {
            fallback_category: fallback_category.to_string(),
        }
    }

    /// Parse `text` lazily according to `mode`
    pub fn parse<'a>(
        &'a self,
        text: &'a str,
        mode: ParseMode<'a>,
    ) -> Box<dyn Iterator<Item = ParsedEntry> + 'a> {
        match mode {
            ParseMode::Flat { category, filter } => Box::new(parse_flat(text, category, filter)),
            ParseMode::Tagged => Box::new(TaggedEntries::new(text, &self.fallback_category)),
            ParseMode::LogScrape => Box::new(parse_log_page(text)),
        }
    }
}
