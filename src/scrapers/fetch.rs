//! Rate-limited, retrying page fetches.

use crate::error::{ExtractError, FetchError, SourceError};
use crate::models::Posting;
use crate::scrapers::traits::{PageLoader, SourceExtractor};
use crate::scrapers::types::{FailurePolicy, FetchSettings, NavigateOptions, RetryPolicy};
use chrono::{DateTime, Utc};
use scraper::Html;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Suspend the current task without blocking other work
pub async fn delay(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Run `operation` up to `policy.retries + 1` times with a fixed pause between
/// attempts. The last error is returned once every attempt has failed.
pub async fn with_retry<T, E, F, Fut>(name: &str, policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt <= policy.retries => {
                warn!(
                    operation = name,
                    attempt,
                    retry_in_ms = policy.delay.as_millis() as u64,
                    error = %err,
                    "Attempt failed, retrying"
                );
                delay(policy.delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(operation = name, attempt, error = %err, "Attempt failed, giving up");
                return Err(err);
            }
        }
    }
}

/// Navigate, then always wait `delay_after` before handing control back.
///
/// This pause is the only rate limit between consecutive requests.
pub async fn safe_goto(
    loader: &dyn PageLoader,
    url: &str,
    options: &NavigateOptions,
) -> Result<String, FetchError> {
    debug!(url, loader = loader.name(), "Navigating");
    let html = loader.load(url, options).await?;
    debug!(url, bytes = html.len(), "Loaded page");
    delay(options.delay_after).await;
    Ok(html)
}

/// Parse `html` and run the extractor over it
pub fn extract_from_html(
    extractor: &dyn SourceExtractor,
    html: &str,
    crawled_at: DateTime<Utc>,
) -> Result<Vec<Posting>, ExtractError> {
    let document = Html::parse_document(html);
    extractor.extract(&document, crawled_at)
}

/// Fetch and extract one source under its failure policy.
///
/// A structural miss after every attempt yields an empty list; only fetch
/// failures of retrying sources come back as errors.
pub async fn fetch_source(
    loader: &dyn PageLoader,
    extractor: &dyn SourceExtractor,
    settings: &FetchSettings,
    crawled_at: DateTime<Utc>,
) -> Result<Vec<Posting>, SourceError> {
    let source = extractor.source();
    let attempt = move || async move {
        let html = safe_goto(loader, extractor.url(), &settings.navigate).await?;
        Ok::<_, SourceError>(extract_from_html(extractor, &html, crawled_at)?)
    };

    let result = match extractor.failure_policy() {
        FailurePolicy::Retry => with_retry(source.tag(), settings.retry, attempt).await,
        FailurePolicy::Tolerant => attempt().await,
    };

    match result {
        Ok(postings) => {
            info!(source = source.tag(), count = postings.len(), "Extracted postings");
            Ok(postings)
        }
        Err(SourceError::Extract(err)) => {
            warn!(source = source.tag(), error = %err, "Page layout not recognised, no postings");
            Ok(Vec::new())
        }
        Err(err) if extractor.failure_policy() == FailurePolicy::Tolerant => {
            warn!(source = source.tag(), error = %err, "Source unavailable, skipping");
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}
