use anyhow::{Context, Result};
use namhae_scout::config::{Config, LoaderKind};
use namhae_scout::notify::{LogNotifier, Notifier, WebhookNotifier};
use namhae_scout::scrapers::{ChromeLoaderFactory, HttpLoaderFactory, LoaderFactory};
use namhae_scout::store::{JsonFileStore, MemoryStore, PostingStore};
use namhae_scout::{is_interrupted, Scout};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("namhae_scout=info")),
        )
        .init();

    info!("🏝️ Namhae Scout - 일자리 & 빈집 크롤러");
    info!("==========================================");

    let config = Config::from_env().context("Failed to load configuration")?;

    let store: Arc<dyn PostingStore> = match &config.store_dir {
        Some(dir) => {
            info!("💾 Storing documents under {}", dir.display());
            Arc::new(JsonFileStore::new(dir.clone()))
        }
        None => {
            warn!("SCOUT_STORE_DIR not set, running in local mode; nothing survives a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.notify_url {
        Some(url) => {
            info!("🔔 Publishing notifications to {}", url);
            Arc::new(WebhookNotifier::new(url.as_str()).context("Failed to create push client")?)
        }
        None => Arc::new(LogNotifier),
    };

    let loaders: Arc<dyn LoaderFactory> = match config.loader {
        LoaderKind::Chrome => Arc::new(ChromeLoaderFactory),
        LoaderKind::Http => Arc::new(HttpLoaderFactory::new()?),
    };

    let scout = Scout::new(store, notifier, loaders).with_settings(config.fetch);

    if config.run_once {
        return match scout.run_cycle_until(ctrl_c()).await {
            Ok(report) => {
                report.log();
                Ok(())
            }
            Err(err) if is_interrupted(&err) => Ok(()),
            Err(err) => Err(err),
        };
    }

    scout.run_scheduled(config.interval, ctrl_c()).await
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be watched
async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
