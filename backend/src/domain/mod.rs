//! Domain layer: models, the merge engine, and pass orchestration.

pub mod merge;
pub mod models;
pub mod scrape_service;

pub use scrape_service::{PassInFlight, ScrapeService};
