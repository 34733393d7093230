//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Recrawler database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Deduplication store: every URL ever admitted to the frontier
CREATE TABLE IF NOT EXISTS seen_urls (
    url TEXT PRIMARY KEY,
    admitted_at TEXT NOT NULL
);

-- Two-tier crawl job queue, FIFO by id within a tier
CREATE TABLE IF NOT EXISTS crawl_jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    queue TEXT NOT NULL,
    base_url TEXT NOT NULL,
    current_url TEXT NOT NULL,
    enqueued_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_jobs_queue ON crawl_jobs(queue, id);

-- Page documents, one row per URL, replaced on recrawl
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    keywords TEXT NOT NULL,
    site_type TEXT NOT NULL,
    content TEXT NOT NULL,
    images TEXT NOT NULL,
    videos TEXT NOT NULL,
    price TEXT NOT NULL,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_site_type ON pages(site_type);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
