//! Persistence layer: trait seams plus the SQLite implementation.

pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteStore;
pub use traits::{DailyRecordStorage, ScrapeLogStorage, StorageError};
