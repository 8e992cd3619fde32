use crate::error::FetchError;
use crate::scrapers::traits::{LoaderFactory, PageLoader};
use crate::scrapers::types::{NavigateOptions, WaitUntil};
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Page loader backed by one headless Chrome tab
pub struct ChromeLoader {
    // Keeps the Chrome process alive for as long as the tab is in use
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeLoader {
    /// Launch headless Chrome and open the tab every navigation reuses.
    ///
    /// Blocks while Chrome starts; call from a blocking context.
    pub fn launch() -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open browser tab")?;

        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

/// Time left for one navigation, shared by every wait inside it
#[derive(Debug, Clone, Copy)]
struct Budget {
    timeout: Duration,
    deadline: Instant,
}

impl Budget {
    fn start(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn spent(&self) -> bool {
        self.remaining().is_zero()
    }
}

fn load_page(tab: &Tab, url: &str, wait_until: WaitUntil, budget: &Budget) -> Result<String> {
    tab.set_default_timeout(budget.remaining());
    tab.navigate_to(url)?;
    tab.set_default_timeout(budget.remaining());
    tab.wait_until_navigated()?;

    if wait_until == WaitUntil::BodyReady {
        tab.wait_for_element_with_custom_timeout("body", budget.remaining())?;
    }

    tab.get_content()
}

/// Navigate the tab and read the page, all within `options.timeout`.
///
/// Runs to completion on the blocking pool, so the tab is never driven by
/// two navigations at once.
fn navigate(tab: &Tab, url: &str, options: &NavigateOptions) -> Result<String, FetchError> {
    let budget = Budget::start(options.timeout);
    load_page(tab, url, options.wait_until, &budget).map_err(|err| {
        if let Err(stop_err) = tab.stop_loading() {
            debug!(url, error = %stop_err, "Failed to stop loading");
        }
        navigation_error(url, &budget, &err)
    })
}

fn navigation_error(url: &str, budget: &Budget, err: &anyhow::Error) -> FetchError {
    if budget.spent() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_ms: budget.timeout.as_millis() as u64,
        }
    } else {
        FetchError::Navigation {
            url: url.to_string(),
            reason: format!("{err:#}"),
        }
    }
}

#[async_trait]
impl PageLoader for ChromeLoader {
    async fn load(&self, url: &str, options: &NavigateOptions) -> Result<String, FetchError> {
        let tab = Arc::clone(&self.tab);
        let target = url.to_string();
        let opts = *options;
        tokio::task::spawn_blocking(move || navigate(&tab, &target, &opts)).await?
    }

    async fn close(&self) -> Result<(), FetchError> {
        let tab = Arc::clone(&self.tab);
        let closed = tokio::task::spawn_blocking(move || tab.close(true)).await?;
        closed.map_err(|err| FetchError::Browser(format!("{err:#}")))?;
        debug!("Closed browser tab");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "chrome"
    }
}

/// Launches a fresh Chrome instance for each crawl cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeLoaderFactory;

#[async_trait]
impl LoaderFactory for ChromeLoaderFactory {
    async fn open(&self) -> Result<Box<dyn PageLoader>> {
        let loader = tokio::task::spawn_blocking(ChromeLoader::launch)
            .await
            .context("Chrome launch task panicked")??;
        Ok(Box::new(loader))
    }
}
