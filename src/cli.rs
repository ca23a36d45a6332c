//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use harvester_core::DEFAULT_MAX_RETRIES;
use harvester_core::catalog::{DEFAULT_ARXIV_QUERY, DEFAULT_MAX_RESULTS};

/// Default number of catalog articles kept after ranking.
const DEFAULT_TOP: u32 = 20;

/// Discover, resolve and download report PDFs.
///
/// Scans seed pages for links that look like reports or studies, finds the
/// PDF behind each one and saves it locally, skipping files that are
/// already complete.
#[derive(Parser, Debug)]
#[command(name = "pdf-harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/pdf-harvester/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory PDFs are written to (default: pdfDatabase)
    #[arg(short = 'o', long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum retry attempts for transient failures (0-10)
    #[arg(short = 'r', long, global = true, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub max_retries: Option<u32>,

    /// Also write logs (without colors) to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Disable per-file progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Returns the effective max retries from CLI or the built-in default.
    #[must_use]
    pub fn max_retries_or(&self, config_value: Option<u32>) -> u32 {
        self.max_retries
            .or(config_value)
            .unwrap_or(DEFAULT_MAX_RETRIES)
    }
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover links on seed pages and download the PDFs behind them
    Harvest(HarvestArgs),
    /// Download the most cited recent arXiv papers and write metadata.json
    Arxiv(ArxivArgs),
}

/// Arguments of `harvest`.
#[derive(ClapArgs, Debug)]
pub struct HarvestArgs {
    /// Seed URLs (also read from --input, or stdin when piped)
    #[arg(value_name = "URL")]
    pub seeds: Vec<String>,

    /// Only follow links whose URL contains this (default: each seed's origin)
    #[arg(short = 'd', long, value_name = "FILTER")]
    pub domain: Option<String>,

    /// Discovery keyword; repeat for several (default: poll, report, research, study, findings)
    #[arg(short = 'k', long = "keyword", value_name = "WORD")]
    pub keywords: Vec<String>,

    /// Newline-delimited file of seed URLs
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Treat seeds as article links and skip discovery
    #[arg(long)]
    pub no_discover: bool,
}

/// Arguments of `arxiv`.
#[derive(ClapArgs, Debug)]
pub struct ArxivArgs {
    /// arXiv search expression
    #[arg(long, default_value = DEFAULT_ARXIV_QUERY)]
    pub query: String,

    /// Entries requested from arXiv (1-2000)
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS, value_parser = clap::value_parser!(u32).range(1..=2000))]
    pub max_results: u32,

    /// Articles kept after ranking by citations (1-2000)
    #[arg(long, default_value_t = DEFAULT_TOP, value_parser = clap::value_parser!(u32).range(1..=2000))]
    pub top: u32,

    /// arXiv API endpoint
    #[arg(long, value_name = "URL")]
    pub arxiv_api_url: Option<String>,

    /// Semantic Scholar Graph API root
    #[arg(long, value_name = "URL")]
    pub citations_api_url: Option<String>,

    /// Base URL arXiv PDF links are built from
    #[arg(long, value_name = "URL")]
    pub pdf_base_url: Option<String>,
}
