pub mod browser;
pub mod candidate;
pub mod fetch;
pub mod house_details;
pub mod houses;
pub mod http;
pub mod jobs;
pub mod probe;
pub mod strategy;
pub mod traits;
pub mod types;

pub use browser::{ChromeLoader, ChromeLoaderFactory};
pub use houses::{GreendaeroExtractor, RefarmExtractor};
pub use http::{HttpLoader, HttpLoaderFactory};
pub use jobs::{BoardExtractor, SaeolExtractor, WorknetExtractor};
pub use traits::{LoaderFactory, PageLoader, SourceExtractor};

/// Every configured source, jobs first, in crawl order
pub fn default_extractors() -> Vec<Box<dyn SourceExtractor>> {
    vec![
        Box::new(SaeolExtractor::new()),
        Box::new(BoardExtractor::new()),
        Box::new(WorknetExtractor::new()),
        Box::new(RefarmExtractor::new()),
        Box::new(GreendaeroExtractor::new()),
    ]
}
