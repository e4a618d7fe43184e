pub mod catalog;

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Output
    pub output_dir: String,
    pub default_base_name: String,

    // Fetching
    pub fetch_timeout_ms: u64,
    pub max_playlist_size_mb: usize,
    pub user_agent: String,

    // Run
    pub default_pages: u32,
    pub fallback_category: String,
    pub source_catalog: Option<String>,
    pub run_deadline_ms: Option<u64>,

    // Logging
    pub log_format: LogFormat,
}

/// Console log layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            // Output
            output_dir: lookup("OUTPUT_DIR").unwrap_or_else(|| "playlists".to_string()),
            default_base_name: lookup("DEFAULT_BASE_NAME")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "INDIA".to_string()),

            // Fetching
            fetch_timeout_ms: lookup("FETCH_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000), // 10 seconds

            max_playlist_size_mb: lookup("MAX_PLAYLIST_SIZE_MB")
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),

            // Use VLC user agent to avoid IPTV server blocks
            user_agent: lookup("USER_AGENT")
                .unwrap_or_else(|| "VLC/3.0.20 LibVLC/3.0.20".to_string()),

            // Run
            default_pages: lookup("DEFAULT_PAGES")
                .and_then(|v| v.parse().ok())
                .filter(|pages| *pages > 0)
                .unwrap_or(5),
            fallback_category: lookup("FALLBACK_CATEGORY")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            source_catalog: lookup("SOURCE_CATALOG").filter(|v| !v.trim().is_empty()),
            run_deadline_ms: lookup("RUN_DEADLINE_MS")
                .and_then(|v| v.parse().ok())
                .filter(|ms| *ms > 0),

            // Logging
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(LogFormat::Pretty),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
