//! Command-line interface and run-context prompting

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use crate::config::Config;
use crate::models::RunContext;

/// iptv-harvester - collect IPTV stream links into categorized M3U playlists
#[derive(Parser, Debug)]
#[command(name = "iptv-harvester")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Do not prompt: empty keyword and the default page count unless given as flags
    #[arg(short = 'y', long = "yes")]
    pub non_interactive: bool,

    /// Channel keyword used to filter links (empty = all)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Number of streamtest.in log pages to scrape
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub pages: Option<u32>,

    /// JSON source catalog replacing the built-in one
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Directory the playlists are written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Also write the run summary as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Resolve the run context from flags, prompting on stdin for anything missing
    pub fn run_context(&self, config: &Config) -> RunContext {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_context_from(config, &mut stdin.lock(), &mut stdout.lock())
    }

    fn run_context_from<R: BufRead, W: Write>(
        &self,
        config: &Config,
        input: &mut R,
        output: &mut W,
    ) -> RunContext {
        let filter = match (&self.filter, self.non_interactive) {
            (Some(filter), _) => filter.clone(),
            (None, true) => String::new(),
            (None, false) => prompt(
                input,
                output,
                "Channel keyword (or leave empty for all channels): ",
            )
            .unwrap_or_default(),
        };

        let pages = match (self.pages, self.non_interactive) {
            (Some(pages), _) => pages,
            (None, true) => config.default_pages,
            (None, false) => {
                let question = format!(
                    "How many pages to scrape from streamtest.in? [{}] ",
                    config.default_pages
                );
                let answer = prompt(input, output, &question).unwrap_or_default();
                parse_pages(&answer, config.default_pages)
            }
        };

        RunContext::new(filter, pages)
    }
}

/// Page bound from user input; anything unusable becomes `default`
fn parse_pages(answer: &str, default: u32) -> u32 {
    let answer = answer.trim();
    if answer.is_empty() {
        return default;
    }

    match answer.parse::<u32>() {
        Ok(pages) if pages > 0 => pages,
        _ => {
            warn!("Invalid page count {:?}, using {}", answer, default);
            default
        }
    }
}

/// Ask one question; `None` when input is closed or unreadable
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Option<String> {
    write!(output, "{}", question).ok()?;
    output.flush().ok()?;

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim().to_string()),
        Err(e) => {
            warn!("Could not read answer: {}", e);
            None
        }
    }
}
