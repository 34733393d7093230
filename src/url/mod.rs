//! URL handling module for Recrawler
//!
//! This module provides URL normalization (the frontier's dedup key),
//! domain extraction, and validation of crawlable URLs.

mod domain;
mod normalize;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::extract_domain;
pub use normalize::normalize_url;

/// Returns true if the URL uses a scheme the fetcher can retrieve
pub fn is_crawlable_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Normalizes a URL and checks that it can be crawled
///
/// Used for seed URLs coming from operators: the URL must parse, use HTTP or
/// HTTPS, and have a host.
///
/// # Examples
///
/// ```
/// use recrawler::url::parse_crawlable;
///
/// assert!(parse_crawlable("https://example.com/start/").is_ok());
/// assert!(parse_crawlable("ftp://example.com/file").is_err());
/// ```
pub fn parse_crawlable(url_str: &str) -> Result<Url, UrlError> {
    let url = normalize_url(url_str)?;

    if !is_crawlable_scheme(&url) {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if extract_domain(&url).is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}
