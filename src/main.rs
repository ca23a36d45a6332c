//! CLI entry point for the PDF harvester.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use harvester_core::catalog::{ArxivClient, CatalogRequest, CitationClient, update_catalog};
use harvester_core::{
    HarvestReport, Harvester, LinkDiscovery, PdfFetcher, RetryPolicy, Session, SessionConfig,
};
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

mod app_config;
mod cli;

use app_config::FileConfig;
use cli::{Args, ArxivArgs, Command, HarvestArgs};

const DEFAULT_OUTPUT_DIR: &str = "pdfDatabase";

/// Settings after merging CLI flags, the config file and defaults.
#[derive(Debug)]
struct RunSettings {
    output_dir: PathBuf,
    page_delay: Option<Duration>,
    link_delay: Option<Duration>,
    download_delay: Option<Duration>,
    show_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args)?;
    debug!(?args, "CLI arguments parsed");

    let file_config = app_config::load_config(args.config.as_deref())?.unwrap_or_default();
    debug!(?file_config, "configuration loaded");

    let session = build_session(&args, &file_config)?;
    let settings = RunSettings {
        output_dir: args
            .output_dir
            .clone()
            .or_else(|| file_config.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        page_delay: file_config.page_delay_ms.map(Duration::from_millis),
        link_delay: file_config.link_delay_ms.map(Duration::from_millis),
        download_delay: file_config.download_delay_ms.map(Duration::from_millis),
        show_progress: !args.no_progress && !args.quiet && io::stderr().is_terminal(),
    };

    match &args.command {
        Command::Harvest(harvest) => run_harvest(&session, &settings, &file_config, harvest).await,
        Command::Arxiv(arxiv) => run_arxiv(&session, &settings, arxiv).await,
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn build_session(args: &Args, file_config: &FileConfig) -> Result<Session> {
    let mut config = SessionConfig {
        retry_policy: RetryPolicy::with_max_retries(args.max_retries_or(file_config.max_retries)),
        ..SessionConfig::default()
    };
    if let Some(secs) = file_config.connect_timeout_secs {
        config.connect_timeout_secs = secs;
    }
    if let Some(secs) = file_config.read_timeout_secs {
        config.read_timeout_secs = secs;
    }
    if let Some(user_agent) = &file_config.user_agent {
        config.user_agent.clone_from(user_agent);
    }

    Session::with_config(config).context("Failed to build HTTP client")
}

fn build_harvester<'a>(session: &'a Session, settings: &RunSettings) -> Harvester<'a> {
    let mut fetcher = PdfFetcher::new(session).with_progress(settings.show_progress);
    if let Some(delay) = settings.download_delay {
        fetcher = fetcher.with_download_delay(delay);
    }
    let mut harvester = Harvester::new(session).with_fetcher(fetcher);
    if let Some(delay) = settings.link_delay {
        harvester = harvester.with_link_delay(delay);
    }
    harvester
}

async fn run_harvest(
    session: &Session,
    settings: &RunSettings,
    file_config: &FileConfig,
    harvest: &HarvestArgs,
) -> Result<()> {
    let seeds = collect_seeds(harvest)?;
    if seeds.is_empty() {
        bail!("No seed URLs given. Pass them as arguments, with --input, or on stdin.");
    }
    info!(seeds = seeds.len(), "harvest starting");

    let links: Vec<String> = if harvest.no_discover {
        seeds
    } else {
        let keywords = if harvest.keywords.is_empty() {
            file_config.keywords.clone()
        } else {
            Some(harvest.keywords.clone())
        };
        let domain = harvest.domain.clone().or_else(|| file_config.domain_filter.clone());
        discover_links(session, settings, &seeds, domain, keywords).await
    };
    info!(links = links.len(), "processing links");

    let harvester = build_harvester(session, settings);
    let report = harvester
        .process_links_with_report(&links, &settings.output_dir)
        .await?;
    print_report(&report, &settings.output_dir);
    Ok(())
}

async fn discover_links(
    session: &Session,
    settings: &RunSettings,
    seeds: &[String],
    domain: Option<String>,
    keywords: Option<Vec<String>>,
) -> Vec<String> {
    // Without an explicit filter each seed is restricted to its own origin.
    let groups: BTreeMap<String, Vec<String>> = match domain {
        Some(domain) => BTreeMap::from([(domain, seeds.to_vec())]),
        None => {
            let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for seed in seeds {
                groups.entry(origin_of(seed)).or_default().push(seed.clone());
            }
            groups
        }
    };

    let mut links = Vec::new();
    for (domain, group) in groups {
        let mut discovery = LinkDiscovery::new(session, domain.as_str());
        if let Some(keywords) = &keywords {
            discovery = discovery.with_keywords(keywords.iter().cloned());
        }
        if let Some(delay) = settings.page_delay {
            discovery = discovery.with_page_delay(delay);
        }
        links.extend(discovery.discover(&group).await);
    }
    links
}

fn origin_of(seed: &str) -> String {
    match Url::parse(seed) {
        Ok(url) => url.origin().ascii_serialization(),
        Err(_) => seed.to_string(),
    }
}

fn collect_seeds(harvest: &HarvestArgs) -> Result<Vec<String>> {
    let mut raw = harvest.seeds.join("\n");
    if let Some(path) = &harvest.input {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file '{}'", path.display()))?;
        raw.push('\n');
        raw.push_str(&contents);
    }
    if harvest.seeds.is_empty() && harvest.input.is_none() && !io::stdin().is_terminal() {
        io::stdin().read_to_string(&mut raw)?;
    }

    let mut seeds = Vec::new();
    for line in raw.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if seeds.iter().any(|s: &String| s == line) {
            continue;
        }
        match Url::parse(line) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => seeds.push(line.to_string()),
            _ => warn!(input = %line, "skipping input that is not an http(s) URL"),
        }
    }
    Ok(seeds)
}

async fn run_arxiv(session: &Session, settings: &RunSettings, arxiv: &ArxivArgs) -> Result<()> {
    let mut arxiv_client = ArxivClient::new(session);
    if let Some(url) = &arxiv.arxiv_api_url {
        arxiv_client = arxiv_client.with_api_url(url.as_str());
    }
    if let Some(url) = &arxiv.pdf_base_url {
        arxiv_client = arxiv_client.with_pdf_base_url(url.as_str());
    }
    let mut citations = CitationClient::new(session);
    if let Some(url) = &arxiv.citations_api_url {
        citations = citations.with_api_url(url.as_str());
    }

    let request = CatalogRequest {
        query: arxiv.query.clone(),
        max_results: arxiv.max_results,
        top_n: arxiv.top as usize,
    };
    let harvester = build_harvester(session, settings);
    let update = update_catalog(
        &arxiv_client,
        &citations,
        &harvester,
        &request,
        &settings.output_dir,
    )
    .await?;

    print_report(&update.report, &settings.output_dir);
    println!(
        "Catalog: {} articles written to {}",
        update.metadata.articles.len(),
        update.metadata_path.display()
    );
    Ok(())
}

fn print_report(report: &HarvestReport, output_dir: &Path) {
    for path in report.paths() {
        println!("{}", path.display());
    }
    println!(
        "Downloaded {}, skipped {} (already complete), unresolved {}, failed {} ({} page, {} download) into {}",
        report.downloaded(),
        report.skipped(),
        report.unresolved(),
        report.page_failures() + report.download_failures(),
        report.page_failures(),
        report.download_failures(),
        output_dir.display()
    );
}
