//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the storage traits.
//! Several worker processes can open the same database file: admissions rely on
//! `INSERT OR IGNORE` and dequeues run inside IMMEDIATE transactions, so the
//! database's write lock provides the admit-once and deliver-once guarantees.

use crate::crawler::SiteType;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DedupStore, JobQueue, PageStore, StorageError, StorageResult};
use crate::storage::{CrawlJob, PageRecord, QueueTier};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // WAL lets readers proceed while another worker holds the write lock
        conn.execute_batch(
            "
            PRAGMA busy_timeout = 5000;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    #[cfg(test)]
    pub(crate) fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn to_json<T: Serialize>(value: &T) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn from_json<T: DeserializeOwned>(column: &str, raw: &str) -> StorageResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Serialization(format!("column {}: {}", column, e)))
}

impl DedupStore for SqliteStorage {
    fn add_if_absent(&self, key: &str) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO seen_urls (url, admitted_at) VALUES (?1, ?2)",
            params![key, now],
        )?;
        Ok(inserted == 1)
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT 1 FROM seen_urls WHERE url = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        let removed = self
            .conn()?
            .execute("DELETE FROM seen_urls WHERE url = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM seen_urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl JobQueue for SqliteStorage {
    fn enqueue(&self, tier: QueueTier, job: &CrawlJob) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn()?.execute(
            "INSERT INTO crawl_jobs (queue, base_url, current_url, enqueued_at) VALUES (?1, ?2, ?3, ?4)",
            params![tier.as_str(), job.base_url, job.current_url, now],
        )?;
        Ok(())
    }

    fn dequeue(&self, tier: QueueTier) -> StorageResult<Option<CrawlJob>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let next: Option<(i64, String, String)> = tx
            .query_row(
                "SELECT id, base_url, current_url FROM crawl_jobs WHERE queue = ?1 ORDER BY id LIMIT 1",
                params![tier.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let job = match next {
            Some((id, base_url, current_url)) => {
                tx.execute("DELETE FROM crawl_jobs WHERE id = ?1", params![id])?;
                Some(CrawlJob {
                    base_url,
                    current_url,
                })
            }
            None => None,
        };

        tx.commit()?;
        Ok(job)
    }

    fn depth(&self, tier: QueueTier) -> StorageResult<u64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM crawl_jobs WHERE queue = ?1",
            params![tier.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl PageStore for SqliteStorage {
    fn upsert_page(&self, page: &PageRecord) -> StorageResult<()> {
        let keywords = to_json(&page.keywords)?;
        let images = to_json(&page.images)?;
        let videos = to_json(&page.videos)?;
        let price = to_json(&page.price)?;

        self.conn()?.execute(
            "INSERT INTO pages (url, title, description, keywords, site_type, content, images, videos, price, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                keywords = excluded.keywords,
                site_type = excluded.site_type,
                content = excluded.content,
                images = excluded.images,
                videos = excluded.videos,
                price = excluded.price,
                crawled_at = excluded.crawled_at",
            params![
                page.url,
                page.title,
                page.description,
                keywords,
                page.site_type.as_str(),
                page.content,
                images,
                videos,
                price,
                page.crawled_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT url, title, description, keywords, site_type, content, images, videos, price, crawled_at
             FROM pages WHERE url = ?1",
        )?;

        let row = stmt
            .query_row(params![url], |row| {
                Ok([
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                ])
            })
            .optional()?;

        let Some([url, title, description, keywords, site_type, content, images, videos, price, crawled_at]) =
            row
        else {
            return Ok(None);
        };

        let site_type = SiteType::from_db_string(&site_type)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown site type '{}'", site_type)))?;
        let crawled_at = DateTime::parse_from_rfc3339(&crawled_at)
            .map_err(|e| StorageError::Corrupt(format!("crawled_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(Some(PageRecord {
            url,
            title,
            description,
            keywords: from_json("keywords", &keywords)?,
            site_type,
            content,
            images: from_json("images", &images)?,
            videos: from_json("videos", &videos)?,
            price: from_json("price", &price)?,
            crawled_at,
        }))
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_pages_by_site_type(&self, site_type: SiteType) -> StorageResult<u64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM pages WHERE site_type = ?1",
            params![site_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
