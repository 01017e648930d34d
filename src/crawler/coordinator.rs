//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that drains the frontier into the
//! document graph, including:
//! - Seeding the frontier from the root address
//! - Applying the scope policy and URL deduplication to each item
//! - Running N workers over one shared frontier
//! - Detecting redirect loops
//! - Emitting parsed/updated/error notifications
//! - Stopping promptly on cancellation

use crate::config::{validate, Config};
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchResult};
use crate::crawler::frontier::{DiscoveredUrl, Frontier};
use crate::events::{EventSender, EventSink};
use crate::graph::{Claim, CrawlResult, DocumentId};
use crate::state::ItemState;
use crate::url::{extract_host, parse_absolute, same_host};
use crate::CartographerError;
use futures::future::join_all;
use reqwest::Client;
use std::time::Instant;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

/// Main crawler coordinator structure
///
/// Owns the HTTP client for its whole lifetime; dropping the coordinator
/// releases the connection pool and closes the event channel.
pub struct Coordinator {
    config: Config,
    client: Client,
    events: EventSink,
}

/// Everything the workers mutate, guarded by one mutex
struct CrawlState {
    frontier: Frontier,
    result: CrawlResult,
    active: usize,
    processed: usize,
    started: Instant,
}

struct Shared {
    state: Mutex<CrawlState>,
    notify: Notify,
}

enum Step {
    Process(DiscoveredUrl),
    Wait,
    Done,
}

/// Decision taken for one frontier item before any I/O
enum Admission {
    Skip,
    Merge,
    Fetch(DocumentId),
}

impl Admission {
    fn state(&self) -> ItemState {
        match self {
            Self::Skip => ItemState::Skipped,
            Self::Merge => ItemState::Merged,
            Self::Fetch(_) => ItemState::Fetched,
        }
    }
}

impl Coordinator {
    /// Creates a coordinator with its own HTTP client
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or the client cannot be built.
    pub fn new(config: Config) -> Result<Self, CartographerError> {
        validate(&config)?;
        let client = build_http_client(&config.crawler)?;
        Ok(Self::with_client(config, client))
    }

    /// Creates a coordinator around an existing client
    ///
    /// The client must not follow redirects on its own.
    pub fn with_client(config: Config, client: Client) -> Self {
        Self {
            config,
            client,
            events: EventSink::default(),
        }
    }

    /// Sends crawl notifications to `sender`
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = EventSink::new(Some(sender));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Crawls `address` until the frontier is exhausted
    pub async fn run(&self, address: &str) -> Result<CrawlResult, CartographerError> {
        self.run_with_cancellation(address, CancellationToken::new())
            .await
    }

    /// Crawls `address` until the frontier is exhausted or `cancel` fires
    ///
    /// A cancelled run still returns the graph built so far. Documents whose
    /// fetch was interrupted keep an error message.
    ///
    /// # Errors
    ///
    /// Returns `CartographerError::InvalidSeed` (after emitting a crawl error
    /// notification) when `address` is not an absolute URL with a host.
    pub async fn run_with_cancellation(
        &self,
        address: &str,
        cancel: CancellationToken,
    ) -> Result<CrawlResult, CartographerError> {
        let seed = match seed_url(address) {
            Ok(seed) => seed,
            Err(e) => {
                self.events.error(e.to_string());
                return Err(e);
            }
        };

        let workers = self.config.crawler.workers.max(1) as usize;
        tracing::info!("Starting crawl of {} with {} worker(s)", seed, workers);

        let mut frontier = Frontier::new();
        frontier.push(DiscoveredUrl::seed(seed.clone()));

        let shared = Shared {
            state: Mutex::new(CrawlState {
                frontier,
                result: CrawlResult::new(seed),
                active: 0,
                processed: 0,
                started: Instant::now(),
            }),
            notify: Notify::new(),
        };

        join_all((0..workers).map(|worker_id| self.worker(worker_id, &shared, &cancel))).await;

        let state = shared.state.into_inner();
        if cancel.is_cancelled() {
            tracing::info!(
                "Crawl cancelled; {} items left in frontier",
                state.frontier.len()
            );
        }
        tracing::info!(
            "Crawl finished: {} documents, {} references, {} of {} queued items processed in {:.1}s",
            state.result.len(),
            state.result.reference_count(),
            state.processed,
            state.frontier.total_enqueued(),
            state.started.elapsed().as_secs_f64()
        );

        Ok(state.result)
    }

    async fn worker(&self, worker_id: usize, shared: &Shared, cancel: &CancellationToken) {
        tracing::debug!("Worker {} started", worker_id);

        while !cancel.is_cancelled() {
            // registered before inspecting the queue so a wakeup between the
            // check and the wait is not lost
            let notified = shared.notify.notified();

            let step = {
                let mut state = shared.state.lock().await;
                match state.frontier.pop() {
                    Some(item) => {
                        state.active += 1;
                        Step::Process(item)
                    }
                    None if state.active == 0 => Step::Done,
                    None => Step::Wait,
                }
            };

            match step {
                Step::Done => {
                    shared.notify.notify_waiters();
                    break;
                }
                Step::Wait => {
                    tokio::select! {
                        _ = notified => {}
                        _ = cancel.cancelled() => {}
                    }
                }
                Step::Process(item) => {
                    let url = item.url.clone();
                    match self.process_item(item, shared, cancel).await {
                        Ok(outcome) => {
                            tracing::debug!("Worker {}: {} {}", worker_id, outcome, url)
                        }
                        Err(e) => tracing::warn!("Worker {}: {}: {}", worker_id, url, e),
                    }
                    self.finish_item(shared).await;
                    shared.notify.notify_waiters();
                }
            }
        }

        tracing::debug!("Worker {} stopped", worker_id);
    }

    async fn process_item(
        &self,
        item: DiscoveredUrl,
        shared: &Shared,
        cancel: &CancellationToken,
    ) -> Result<ItemState, CartographerError> {
        let admission = {
            let mut state = shared.state.lock().await;
            self.admit(&mut state, &item)
        };

        let outcome = ItemState::Pending.transition(admission.state())?;
        let Admission::Fetch(id) = admission else {
            return Ok(outcome);
        };

        let fetched = tokio::select! {
            result = fetch_url(&self.client, &self.config.user_agent.value, &item.url) => result,
            _ = cancel.cancelled() => {
                tracing::info!("Fetch of {} cancelled", item.url);
                FetchResult::cancelled()
            }
        };

        let mut state = shared.state.lock().await;
        self.record(&mut state, id, fetched);

        Ok(outcome)
    }

    /// Scope check, redirect-loop check and dedup claim for one item
    fn admit(&self, state: &mut CrawlState, item: &DiscoveredUrl) -> Admission {
        if !in_scope(&state.result, item) {
            return Admission::Skip;
        }

        let limit = self.config.crawler.max_documents;
        if limit > 0 && state.result.len() >= limit && !state.result.contains(&item.url) {
            tracing::debug!("Document limit {} reached, skipping {}", limit, item.url);
            return Admission::Skip;
        }

        match state.result.claim(&item.url) {
            Claim::Existing(target) => {
                if let Some(source) = item.referrer {
                    if item.is_redirect {
                        self.check_redirect_loop(&mut state.result, source, target);
                    }

                    let reference =
                        state
                            .result
                            .add_reference(source, target, item.excerpt.clone());

                    // refs added while the target is in flight ride on its parsed event
                    if let Some(reference) = reference {
                        if !state.result.is_in_flight(target) {
                            if let Some(doc) = state.result.document(target) {
                                self.events.updated(doc, Some(reference));
                            }
                        }
                    }
                }
                Admission::Merge
            }
            Claim::New(id) => {
                if let Some(source) = item.referrer {
                    state.result.add_reference(source, id, item.excerpt.clone());
                }
                Admission::Fetch(id)
            }
        }
    }

    /// Flags the cycle closed by a redirect from `source` to `target`, if any
    ///
    /// Every document on a cycle is complete by the time the last one's
    /// redirect is admitted, so the walk finds the loop whatever order the
    /// documents were reached in.
    fn check_redirect_loop(
        &self,
        result: &mut CrawlResult,
        source: DocumentId,
        target: DocumentId,
    ) {
        let Some(cycle) = result.redirect_cycle(source, target) else {
            return;
        };

        let urls: Vec<&str> = cycle
            .iter()
            .filter_map(|id| result.document(*id))
            .map(|doc| doc.url.as_str())
            .collect();
        tracing::warn!("Redirect loop detected: {}", urls.join(" -> "));

        for id in cycle {
            if result.mark_redirection_loop(id) {
                if let Some(doc) = result.document(id) {
                    self.events.updated(doc, None);
                }
            }
        }
    }

    /// Stores a finished fetch and queues the links it produced
    fn record(&self, state: &mut CrawlState, id: DocumentId, fetched: FetchResult) {
        let FetchResult { page, links } = fetched;

        for link in links {
            state.frontier.push(DiscoveredUrl::from_link(link, id));
        }

        if let Some(doc) = state.result.complete(id, page) {
            if let Some(error) = &doc.error_message {
                tracing::debug!("{} failed: {}", doc.url, error);
            }
            self.events.parsed(doc);
        }
    }

    async fn finish_item(&self, shared: &Shared) {
        let mut state = shared.state.lock().await;
        state.active = state.active.saturating_sub(1);
        state.processed += 1;

        if state.processed % 10 == 0 {
            let rate = state.processed as f64 / state.started.elapsed().as_secs_f64();
            tracing::info!(
                "Progress: {} items processed, {} documents, {} in frontier, {:.2} items/sec",
                state.processed,
                state.result.len(),
                state.frontier.len(),
                rate
            );
        }
    }
}

/// Scope policy: redirect targets, seed-host URLs, and anything referred to
/// by a seed-host document
fn in_scope(result: &CrawlResult, item: &DiscoveredUrl) -> bool {
    if item.is_redirect || same_host(result.address(), &item.url) {
        return true;
    }

    item.referrer
        .and_then(|id| result.document(id))
        .is_some_and(|referrer| same_host(result.address(), &referrer.url))
}

/// Validates the root address and strips its fragment
fn seed_url(address: &str) -> Result<String, CartographerError> {
    let invalid = |reason: String| CartographerError::InvalidSeed {
        url: address.to_string(),
        reason,
    };

    let mut url = parse_absolute(address).map_err(|e| invalid(e.to_string()))?;
    extract_host(url.as_str()).map_err(|e| invalid(e.to_string()))?;
    url.set_fragment(None);

    Ok(url.into())
}

/// Crawls `address` with a freshly built coordinator
///
/// # Example
///
/// ```no_run
/// use site_cartographer::{run_crawl, Config};
///
/// # async fn demo() -> site_cartographer::Result<()> {
/// let result = run_crawl(Config::default(), "https://example.com/").await?;
/// println!("{} documents", result.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, address: &str) -> Result<CrawlResult, CartographerError> {
    let coordinator = Coordinator::new(config)?;
    coordinator.run(address).await
}
