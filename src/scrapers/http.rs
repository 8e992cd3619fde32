use crate::error::FetchError;
use crate::scrapers::traits::{LoaderFactory, PageLoader};
use crate::scrapers::types::NavigateOptions;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Plain HTTP loader for hosts without Chrome. Pages are read as served,
/// without running any script.
#[derive(Clone)]
pub struct HttpLoader {
    client: Client,
}

impl HttpLoader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    fn request_error(url: &str, options: &NavigateOptions, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_ms: options.timeout.as_millis() as u64,
            }
        } else {
            FetchError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl PageLoader for HttpLoader {
    async fn load(&self, url: &str, options: &NavigateOptions) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|err| Self::request_error(url, options, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| Self::request_error(url, options, err))?;
        debug!(url, bytes = body.len(), "Fetched page over HTTP");
        Ok(body)
    }

    async fn close(&self) -> Result<(), FetchError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Hands out clones of one shared HTTP client
#[derive(Clone)]
pub struct HttpLoaderFactory {
    loader: HttpLoader,
}

impl HttpLoaderFactory {
    pub fn new() -> Result<Self> {
        Ok(Self {
            loader: HttpLoader::new()?,
        })
    }
}

#[async_trait]
impl LoaderFactory for HttpLoaderFactory {
    async fn open(&self) -> Result<Box<dyn PageLoader>> {
        Ok(Box::new(self.loader.clone()))
    }
}
