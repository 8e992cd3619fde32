use crate::error::{ExtractError, FetchError};
use crate::models::{Posting, Source};
use crate::scrapers::types::{FailurePolicy, NavigateOptions};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;

/// Navigation primitive: load a URL and hand back the rendered HTML
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Navigate to `url` within `options.timeout` and return the page content
    async fn load(&self, url: &str, options: &NavigateOptions) -> Result<String, FetchError>;

    /// Release the underlying browser or connection resources
    async fn close(&self) -> Result<(), FetchError>;

    fn name(&self) -> &'static str;
}

/// Opens one loader per crawl cycle
#[async_trait]
pub trait LoaderFactory: Send + Sync {
    async fn open(&self) -> anyhow::Result<Box<dyn PageLoader>>;
}

/// Per-site extraction rules.
///
/// Implementations are pure: everything they need comes from the parsed
/// document, and they never touch the network.
pub trait SourceExtractor: Send + Sync {
    fn source(&self) -> Source;

    /// Turn a loaded page into postings
    fn extract(&self, document: &Html, crawled_at: DateTime<Utc>) -> Result<Vec<Posting>, ExtractError>;

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Retry
    }

    /// Page to load; defaults to the source's landing page
    fn url(&self) -> &str {
        self.source().landing_url()
    }
}
