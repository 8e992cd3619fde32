//! Crawl cycles and the periodic scheduler.

use crate::error::CycleError;
use crate::identity::{save_if_new, DEFAULT_KEY_FIELD};
use crate::models::{Category, Posting, Source};
use crate::notify::{Notification, Notifier};
use crate::scrapers::fetch::fetch_source;
use crate::scrapers::traits::{LoaderFactory, PageLoader, SourceExtractor};
use crate::scrapers::types::FetchSettings;
use crate::scrapers::default_extractors;
use crate::store::PostingStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Outcome of one category within a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: Category,
    /// Postings extracted across all of the category's sources
    pub collected: usize,
    /// Postings stored for the first time
    pub new: usize,
    pub failed_sources: Vec<Source>,
    pub store_errors: usize,
}

impl CategoryReport {
    fn new(category: Category) -> Self {
        Self {
            category,
            collected: 0,
            new: 0,
            failed_sources: Vec::new(),
            store_errors: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub categories: Vec<CategoryReport>,
    pub duration: Duration,
}

impl CycleReport {
    pub fn category(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|report| report.category == category)
    }

    pub fn total_new(&self) -> usize {
        self.categories.iter().map(|report| report.new).sum()
    }

    pub fn log(&self) {
        for report in &self.categories {
            info!(
                category = report.category.collection(),
                collected = report.collected,
                new = report.new,
                failed_sources = report.failed_sources.len(),
                store_errors = report.store_errors,
                "📊 {} crawl finished",
                report.category.label()
            );
        }
        info!(
            new = self.total_new(),
            duration_ms = self.duration.as_millis() as u64,
            "✅ Cycle complete"
        );
    }
}

/// Drives crawl cycles: fetch every source, persist what is new, notify.
pub struct Scout {
    store: Arc<dyn PostingStore>,
    notifier: Arc<dyn Notifier>,
    loaders: Arc<dyn LoaderFactory>,
    extractors: Vec<Box<dyn SourceExtractor>>,
    settings: FetchSettings,
    key_field: String,
    in_flight: Mutex<()>,
}

impl Scout {
    /// A scout over every built-in source with default fetch settings
    pub fn new(
        store: Arc<dyn PostingStore>,
        notifier: Arc<dyn Notifier>,
        loaders: Arc<dyn LoaderFactory>,
    ) -> Self {
        Self {
            store,
            notifier,
            loaders,
            extractors: default_extractors(),
            settings: FetchSettings::default(),
            key_field: DEFAULT_KEY_FIELD.to_string(),
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_extractors(mut self, extractors: Vec<Box<dyn SourceExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn with_settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Document field compared when deciding whether a posting is new
    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }

    /// Run one full crawl cycle.
    ///
    /// Refused with [`CycleError::AlreadyRunning`] while another cycle holds
    /// the lock. Failing sources are recorded in the report, never raised.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.run_cycle_until(std::future::pending::<()>()).await
    }

    /// Run one crawl cycle, abandoning the crawl once `stop` resolves.
    ///
    /// An abandoned cycle still closes its loader, stores nothing and fails
    /// with [`CycleError::Interrupted`].
    pub async fn run_cycle_until<F>(&self, stop: F) -> Result<CycleReport>
    where
        F: Future<Output = ()>,
    {
        let _guard = self.in_flight.try_lock().map_err(|_| CycleError::AlreadyRunning)?;

        let started = Instant::now();
        let crawled_at = Utc::now();
        info!(sources = self.extractors.len(), "🔍 Starting crawl cycle");

        let loader = self.loaders.open().await.context("Failed to open page loader")?;

        let crawled = tokio::select! {
            biased;
            crawled = self.crawl_all(loader.as_ref(), crawled_at) => Some(crawled),
            _ = stop => None,
        };

        if let Err(err) = loader.close().await {
            warn!(loader = loader.name(), error = %err, "Failed to close page loader");
        }

        let Some((mut reports, collected)) = crawled else {
            warn!("🛑 Crawl cycle interrupted, nothing from it is stored");
            return Err(CycleError::Interrupted.into());
        };

        let mut outbox = JoinSet::new();
        for (report, postings) in reports.iter_mut().zip(collected) {
            self.persist(report, postings, &mut outbox).await;
        }
        while let Some(joined) = outbox.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "Notification task failed");
            }
        }

        Ok(CycleReport {
            categories: reports,
            duration: started.elapsed(),
        })
    }

    async fn crawl_all(
        &self,
        loader: &dyn PageLoader,
        crawled_at: DateTime<Utc>,
    ) -> (Vec<CategoryReport>, Vec<Vec<Posting>>) {
        let mut reports = Vec::new();
        let mut collected = Vec::new();
        for category in Category::ALL {
            let mut report = CategoryReport::new(category);
            let postings = self.crawl_category(loader, category, crawled_at, &mut report).await;
            report.collected = postings.len();
            reports.push(report);
            collected.push(postings);
        }
        (reports, collected)
    }

    async fn crawl_category(
        &self,
        loader: &dyn PageLoader,
        category: Category,
        crawled_at: DateTime<Utc>,
        report: &mut CategoryReport,
    ) -> Vec<Posting> {
        info!(category = category.collection(), "Crawling {}", category.label());
        let mut postings = Vec::new();

        for extractor in self.extractors.iter().filter(|e| e.source().category() == category) {
            let source = extractor.source();
            match fetch_source(loader, extractor.as_ref(), &self.settings, crawled_at).await {
                Ok(found) => postings.extend(found),
                Err(err) => {
                    error!(source = source.tag(), error = %err, "Source failed, continuing with the rest");
                    report.failed_sources.push(source);
                }
            }
        }

        postings
    }

    async fn persist(&self, report: &mut CategoryReport, postings: Vec<Posting>, outbox: &mut JoinSet<()>) {
        let category = report.category;

        for posting in postings {
            match save_if_new(self.store.as_ref(), category, &posting, &self.key_field).await {
                Ok(true) => {
                    report.new += 1;
                    info!(category = category.collection(), id = %posting.id, "[신규] {}", posting.title);
                    self.notify(outbox, category, &posting);
                }
                Ok(false) => {}
                Err(err) => {
                    report.store_errors += 1;
                    warn!(
                        backend = self.store.backend_name(),
                        id = %posting.id,
                        error = %err,
                        "Failed to store posting"
                    );
                }
            }
        }
    }

    /// Publish in the background so a slow push gateway never holds up the
    /// next write; the cycle joins `outbox` before it returns
    fn notify(&self, outbox: &mut JoinSet<()>, category: Category, posting: &Posting) {
        let notifier = Arc::clone(&self.notifier);
        let notification = Notification::for_posting(posting);
        let topic = category.topic();
        outbox.spawn(async move {
            if let Err(err) = notifier.publish(topic, &notification).await {
                warn!(topic, id = %notification.item_id, error = %err, "Failed to publish notification");
            }
        });
    }

    /// Run a cycle now, then every `interval` until `shutdown` resolves.
    ///
    /// Each cycle is awaited before the next tick; ticks missed while a slow
    /// cycle runs are skipped rather than bunched up. A shutdown that arrives
    /// mid-cycle interrupts that cycle.
    pub async fn run_scheduled<F>(&self, interval: Duration, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(interval_mins = interval.as_secs() / 60, "⏰ Scheduler started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("🛑 Shutdown requested, stopping scheduler");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            match self.run_cycle_until(&mut shutdown).await {
                Ok(report) => report.log(),
                Err(err) if is_interrupted(&err) => {
                    info!("🛑 Shutdown requested, stopping scheduler");
                    return Ok(());
                }
                Err(err) => error!(error = %format!("{err:#}"), "Crawl cycle failed"),
            }
        }
    }
}

/// Whether a cycle failed because it was told to stop
pub fn is_interrupted(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<CycleError>(), Some(CycleError::Interrupted))
}
