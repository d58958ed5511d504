pub mod sqlite;

use crate::app::Result;
use crate::domain::ArticleRecord;

pub use sqlite::SqliteStore;

/// Durable article storage, deduplicated by [`ArticleRecord::fingerprint`].
pub trait ArticleStore {
    /// Persist a record. `Ok(true)` when a new row was written, `Ok(false)`
    /// when a record with the same fingerprint already exists. Errors are
    /// reserved for genuine storage failures.
    fn save(&self, record: &ArticleRecord) -> Result<bool>;

    fn exists(&self, fingerprint: &str) -> Result<bool>;

    fn count(&self) -> Result<usize>;

    /// Most recently saved records, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<ArticleRecord>>;
}
