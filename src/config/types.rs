use crate::crawler::Priority;
use serde::Deserialize;

/// Main configuration structure for Recrawler
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of fetch-and-process pipelines running at once
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// How long a worker sleeps when both queues are empty (milliseconds)
    #[serde(rename = "idle-poll-ms")]
    pub idle_poll_ms: u64,

    /// Timeout for a single page fetch (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Recrawl adjustment factor describing how often pages change
    #[serde(rename = "update-frequency")]
    pub update_frequency: Priority,

    /// Recrawl adjustment factor describing how much the crawl cares about pages
    pub importance: Priority,

    /// Substrings that exclude a link reference from the frontier
    #[serde(rename = "link-blocklist")]
    pub link_blocklist: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 5,
            idle_poll_ms: 1000,
            request_timeout_secs: 30,
            update_frequency: Priority::Medium,
            importance: Priority::Medium,
            link_blocklist: DEFAULT_LINK_BLOCKLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Boilerplate link categories that waste crawl budget
pub const DEFAULT_LINK_BLOCKLIST: &[&str] = &[
    "privacy",
    "terms",
    "conditions",
    "payment",
    "donate",
    "cookie",
    "subscription",
];

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "recrawler".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/recrawler".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database holding the dedup store, job queues and pages
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "recrawler.db".to_string(),
        }
    }
}
