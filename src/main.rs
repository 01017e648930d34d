//! Site-Cartographer main entry point
//!
//! This is the command-line interface for the Site-Cartographer structure auditor.

use anyhow::Context;
use clap::Parser;
use site_cartographer::config::{load_config_with_hash, validate, Config};
use site_cartographer::events::{self, CrawlEvent, EventReceiver};
use site_cartographer::output::{print_statistics, CrawlStatistics};
use site_cartographer::Coordinator;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Site-Cartographer: a website structure auditor
///
/// Site-Cartographer crawls a site from a seed address and maps every page,
/// script, stylesheet and media file it references, together with the links
/// between them. Pages on the seed host are followed; resources on other
/// hosts are fetched once.
#[derive(Parser, Debug)]
#[command(name = "site-cartographer")]
#[command(version = "1.0.0")]
#[command(about = "A website structure auditor", long_about = None)]
struct Cli {
    /// Seed address to start crawling from
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of concurrent workers (overrides the config file)
    #[arg(short, long)]
    workers: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and seed address without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config, &cli.url)?;
        return Ok(());
    }

    handle_crawl(config, &cli.url).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_cartographer=info,warn"),
            1 => EnvFilter::new("site_cartographer=debug,info"),
            2 => EnvFilter::new("site_cartographer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, url: &str) -> anyhow::Result<()> {
    println!("=== Site-Cartographer Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Connect timeout: {}s", config.crawler.connect_timeout);
    match config.crawler.max_documents {
        0 => println!("  Max documents: unlimited"),
        n => println!("  Max documents: {}", n),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.value);

    let host = site_cartographer::url::extract_host(url)
        .with_context(|| format!("invalid seed address {}", url))?;

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} (scope: host {})", url, host);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, url: &str) -> anyhow::Result<()> {
    let (sender, receiver) = events::channel();
    let coordinator = Coordinator::new(config)?.with_events(sender);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping crawl");
                cancel.cancel();
            }
        }
    });

    let logger = tokio::spawn(log_events(receiver));

    let result = coordinator.run_with_cancellation(url, cancel).await;

    // closes the event channel so the logger drains and exits
    drop(coordinator);
    if let Err(e) = logger.await {
        tracing::warn!("Event logger stopped unexpectedly: {}", e);
    }

    let result = result.context("crawl failed")?;

    let stats = CrawlStatistics::from_result(&result);
    println!();
    print_statistics(&stats);

    Ok(())
}

/// Logs crawl notifications as they arrive
async fn log_events(mut receiver: EventReceiver) {
    while let Some(event) = receiver.recv().await {
        match event {
            CrawlEvent::DocumentParsed { document } => {
                let status = document
                    .status_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "ERR".to_string());
                match &document.redirect_url {
                    Some(target) => tracing::info!(
                        "[{}] {} {} -> {}",
                        status,
                        document.id,
                        document.url,
                        target
                    ),
                    _ => tracing::info!("[{}] {} {}", status, document.id, document.url),
                }
            }
            CrawlEvent::DocumentUpdated {
                document,
                reference,
            } => match reference {
                Some(reference) => tracing::debug!(
                    "{} now referenced by {}",
                    document.url,
                    reference.source_url
                ),
                None if document.is_redirection_loop => {
                    tracing::warn!("{} is part of a redirect loop", document.url)
                }
                None => tracing::debug!("{} updated", document.url),
            },
            CrawlEvent::CrawlError { message } => tracing::error!("{}", message),
        }
    }
}
