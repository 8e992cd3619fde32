pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod scrapers;
pub mod store;
pub mod text;

pub use orchestrator::{is_interrupted, CategoryReport, CycleReport, Scout};
