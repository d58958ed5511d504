use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use rusqlite_migration::{Migrations, M};

use crate::app::{CrawlError, Result};
use crate::domain::ArticleRecord;
use crate::store::ArticleStore;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CrawlError::Other(format!("Store lock poisoned: {}", e)))
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| CrawlError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }
}

impl ArticleStore for SqliteStore {
    fn save(&self, record: &ArticleRecord) -> Result<bool> {
        let conn = self.lock()?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO articles
                (fingerprint, keyword, title, summary, source, publish_time,
                 indirect_url, resolved_url, body, crawled_at, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.fingerprint(),
                record.keyword,
                record.title,
                record.summary,
                record.source,
                record.publish_time,
                record.indirect_url,
                record.resolved_url,
                record.body,
                record.crawled_at.to_rfc3339(),
                Utc::now().to_rfc3339()
            ],
        )?;

        Ok(inserted > 0)
    }

    fn exists(&self, fingerprint: &str) -> Result<bool> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE fingerprint = ?1",
            params![fingerprint],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn recent(&self, limit: usize) -> Result<Vec<ArticleRecord>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT keyword, title, summary, source, publish_time,
                    indirect_url, resolved_url, body, crawled_at
             FROM articles ORDER BY id DESC LIMIT ?1",
        )?;

        let records = stmt
            .query_map(params![limit as i64], |row| {
                let resolved_url: Option<String> = row.get(6)?;
                let resolved_url = resolved_url.unwrap_or_default();
                Ok(ArticleRecord {
                    keyword: row.get(0)?,
                    title: row.get(1)?,
                    summary: row.get(2)?,
                    source: row.get(3)?,
                    publish_time: row.get(4)?,
                    indirect_url: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                    resolved: !resolved_url.is_empty(),
                    resolved_url,
                    body: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                    crawled_at: row
                        .get::<_, String>(8)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                    content_fetched: true,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
