use crate::UrlError;
use url::Url;

/// Normalizes a URL into the frontier's canonical dedup key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Lowercase scheme and host (done by the parser for special schemes)
/// 3. Remove fragment (everything after #)
/// 4. Remove the query string
/// 5. Remove trailing slashes from the path (except for root /)
///
/// The scheme is kept in the key, so `http://` and `https://` variants of the
/// same page are distinct frontier entries. Normalization is idempotent.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL; `as_str()` is the dedup key
/// * `Err(UrlError)` - Failed to parse the URL
///
/// # Examples
///
/// ```
/// use recrawler::url::normalize_url;
///
/// let url = normalize_url("https://Blog.Example.COM/path/?page=2#top").unwrap();
/// assert_eq!(url.as_str(), "https://blog.example.com/path");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    url.set_fragment(None);
    url.set_query(None);

    if !url.cannot_be_a_base() {
        let trimmed = url.path().trim_end_matches('/');
        if trimmed.is_empty() {
            url.set_path("/");
        } else if trimmed.len() != url.path().len() {
            let trimmed = trimmed.to_string();
            url.set_path(&trimmed);
        }
    }

    Ok(url)
}
