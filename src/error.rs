use thiserror::Error;

/// Failure to load a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("blocking browser task failed: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for FetchError {
    fn from(err: tokio::task::JoinError) -> Self {
        FetchError::Join(err.to_string())
    }
}

/// Page loaded but no extraction tier found anything
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no selector tier matched on {source_name}")]
    NoMatch { source_name: &'static str },
}

/// Per-source failure as seen by the orchestrator
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store rejected write: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("push request failed: {0}")]
    Http(String),

    #[error("push endpoint rejected message (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Http(err.to_string())
    }
}

/// Control-flow failures that abort a whole crawl cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("a crawl cycle is already running")]
    AlreadyRunning,

    #[error("the crawl cycle was interrupted before it finished")]
    Interrupted,
}
