//! HTML parsing: link extraction and page data extraction
//!
//! This module handles parsing fetched HTML to produce:
//! - Outbound links to admit to the frontier (filtered and resolved)
//! - The page title, description and keyword set used by the classifier
//! - Visible text with boilerplate elements stripped
//! - Images, videos and product prices for the page record
//!
//! `scraper::Html` is not `Send`, so everything here is synchronous and
//! returns owned data that can cross an `.await`.

use crate::crawler::SiteType;
use crate::storage::{ImageRef, PageRecord, ProductPrice};
use crate::CrawlerError;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeSet, HashSet};
use url::Url;

/// Elements whose text is never part of the visible content
const STRIPPED_ELEMENTS: &str = "script, style, nav, header, footer, noscript";

/// Words too common to say anything about a page
const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "also", "and", "any", "are", "because",
    "been", "before", "being", "below", "between", "both", "but", "can", "could", "did", "does",
    "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has", "have",
    "having", "her", "here", "hers", "herself", "him", "himself", "his", "how", "into", "its",
    "itself", "just", "more", "most", "not", "now", "off", "once", "only", "other", "our", "ours",
    "out", "over", "own", "same", "she", "should", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "then", "there", "these", "they", "this", "those", "through", "too",
    "under", "until", "very", "was", "were", "what", "when", "where", "which", "while", "who",
    "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
];

/// Filters and resolves the outbound links of a page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` references that are root-relative (`/path`) or absolute
///   `http`/`https` URLs
///
/// **Exclude:**
/// - Protocol-relative (`//host/path`) and path-relative (`page.html`) references
/// - `javascript:`, `mailto:`, `tel:` and any other non-HTTP scheme
/// - References containing a fragment marker (`#`)
/// - References whose lowercased form contains a block-list substring
///
/// Results come out in document order with duplicates collapsed.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    blocklist: Vec<String>,
}

impl LinkExtractor {
    /// Creates an extractor with the given block-list substrings
    pub fn new<I, S>(blocklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blocklist: blocklist
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// The block-list substrings, lowercased
    pub fn blocklist(&self) -> &[String] {
        &self.blocklist
    }

    /// Returns true if a raw reference passes the shape and block-list filters
    pub fn accepts(&self, href: &str) -> bool {
        let href = href.trim();
        let lower = href.to_lowercase();

        let root_relative = href.starts_with('/') && !href.starts_with("//");
        let absolute = lower.starts_with("http://") || lower.starts_with("https://");
        if !root_relative && !absolute {
            return false;
        }

        if href.contains('#') {
            return false;
        }

        !self.blocklist.iter().any(|blocked| lower.contains(blocked))
    }

    /// Resolves an accepted reference against the page URL
    fn resolve(&self, href: &str, base_url: &Url) -> Option<Url> {
        let href = href.trim();
        if !self.accepts(href) {
            tracing::trace!("Filtered link {} on {}", href, base_url);
            return None;
        }

        match base_url.join(href) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Failed to resolve link {} on {}: {}", href, base_url, e);
                None
            }
        }
    }

    /// Lazily yields the page's outbound links
    pub fn links<'a>(
        &'a self,
        document: &'a Html,
        base_url: &'a Url,
    ) -> impl Iterator<Item = Url> + 'a {
        let mut seen = HashSet::new();
        document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| element.value().name() == "a")
            .filter_map(|element| element.value().attr("href"))
            .filter_map(move |href| self.resolve(href, base_url))
            .filter(move |url| seen.insert(url.to_string()))
    }

    /// Parses `html` and collects its outbound links
    ///
    /// # Example
    ///
    /// ```
    /// use recrawler::crawler::LinkExtractor;
    /// use url::Url;
    ///
    /// let extractor = LinkExtractor::new(["privacy"]);
    /// let html = r#"<a href="/privacy">Privacy</a><a href="/buy-now">Buy</a>"#;
    /// let base = Url::parse("https://a.com/").unwrap();
    ///
    /// let links = extractor.extract_links(html, &base);
    /// assert_eq!(links.len(), 1);
    /// assert_eq!(links[0].as_str(), "https://a.com/buy-now");
    /// ```
    pub fn extract_links(&self, html: &str, base_url: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        self.links(&document, base_url).collect()
    }
}

/// Everything extracted from one HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    pub title: String,
    pub description: String,
    pub keywords: BTreeSet<String>,
    pub content: String,
    pub images: Vec<ImageRef>,
    pub videos: Vec<String>,
    pub price: Vec<ProductPrice>,
    pub links: Vec<Url>,
}

impl ExtractedPage {
    /// Builds the page record stored for `url`
    pub fn to_record(&self, url: &str, site_type: SiteType) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            keywords: self.keywords.clone(),
            site_type,
            content: self.content.clone(),
            images: self.images.clone(),
            videos: self.videos.clone(),
            price: self.price.clone(),
            crawled_at: Utc::now(),
        }
    }
}

/// Parses a page and extracts its links and data
///
/// Links are taken before boilerplate stripping, so navigation menus still
/// feed the frontier; text, keywords and the fallback description come from
/// the stripped document.
///
/// # Returns
///
/// * `Ok(ExtractedPage)` - The extracted data
/// * `Err(CrawlerError::ExtractionFailure)` - The body holds no document
pub fn extract_page(
    html: &str,
    page_url: &Url,
    extractor: &LinkExtractor,
) -> Result<ExtractedPage, CrawlerError> {
    if html.trim().is_empty() {
        return Err(CrawlerError::ExtractionFailure {
            url: page_url.to_string(),
            message: "empty document".to_string(),
        });
    }

    let selector = |css: &str| {
        Selector::parse(css).map_err(|e| CrawlerError::ExtractionFailure {
            url: page_url.to_string(),
            message: format!("invalid selector {}: {:?}", css, e),
        })
    };

    let mut document = Html::parse_document(html);

    let links: Vec<Url> = extractor.links(&document, page_url).collect();
    let title = document
        .select(&selector("title")?)
        .next()
        .map(|element| collapse_whitespace(&element_text(&element)))
        .unwrap_or_default();
    let meta_description = meta_content(&document, &selector("meta[name=description]")?);
    let meta_keywords = meta_content(&document, &selector("meta[name=keywords]")?);
    let images = extract_images(&document, &selector("img[src]")?, page_url);
    let videos = extract_videos(
        &document,
        &selector("video[src], video source[src]")?,
        page_url,
    );
    let price = extract_prices(&document, &selector)?;

    strip_elements(&mut document, &selector(STRIPPED_ELEMENTS)?);

    let content = visible_text(&document, &selector("body")?);
    let description = match meta_description {
        Some(description) => description,
        None => document
            .select(&selector("p")?)
            .map(|p| collapse_whitespace(&element_text(&p)))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    };

    let mut keywords = BTreeSet::new();
    if let Some(meta) = &meta_keywords {
        collect_keywords(meta, &mut keywords);
    }
    collect_keywords(&content, &mut keywords);

    Ok(ExtractedPage {
        title,
        description,
        keywords,
        content,
        images,
        videos,
        price,
        links,
    })
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr("content"))
        .map(collapse_whitespace)
        .find(|content| !content.is_empty())
}

/// Detaches every matching subtree from the document
fn strip_elements(document: &mut Html, selector: &Selector) {
    let ids: Vec<_> = document.select(selector).map(|element| element.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn visible_text(document: &Html, body: &Selector) -> String {
    let text = match document.select(body).next() {
        Some(body) => element_text(&body),
        None => element_text(&document.root_element()),
    };
    collapse_whitespace(&text)
}

/// Adds the meaningful words of `text` to `keywords`
fn collect_keywords(text: &str, keywords: &mut BTreeSet<String>) {
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.chars().count() < 3 || word.chars().any(|c| c.is_numeric()) {
            continue;
        }
        let word = word.to_lowercase();
        if STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        keywords.insert(word);
    }
}

fn resolve_http(src: &str, page_url: &Url) -> Option<Url> {
    page_url
        .join(src.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

fn extract_images(document: &Html, selector: &Selector, page_url: &Url) -> Vec<ImageRef> {
    document
        .select(selector)
        .filter_map(|img| {
            let src = resolve_http(img.value().attr("src")?, page_url)?;
            Some(ImageRef {
                src: src.to_string(),
                alt: img
                    .value()
                    .attr("alt")
                    .map(collapse_whitespace)
                    .unwrap_or_default(),
            })
        })
        .collect()
}

fn extract_videos(document: &Html, selector: &Selector, page_url: &Url) -> Vec<String> {
    let mut videos: Vec<String> = Vec::new();
    for element in document.select(selector) {
        let Some(src) = element
            .value()
            .attr("src")
            .and_then(|src| resolve_http(src, page_url))
        else {
            continue;
        };
        let src = src.to_string();
        if !videos.contains(&src) {
            videos.push(src);
        }
    }
    videos
}

/// Finds product name and price pairs
///
/// Two markups are recognized: schema.org microdata (`itemprop=price` inside
/// an `itemtype` mentioning `Product`) and `.product` containers holding a
/// `.price` element next to a name or heading.
fn extract_prices<F>(document: &Html, selector: &F) -> Result<Vec<ProductPrice>, CrawlerError>
where
    F: Fn(&str) -> Result<Selector, CrawlerError>,
{
    let mut prices: Vec<ProductPrice> = Vec::new();
    let mut push = |name: String, price: String| {
        if name.is_empty() || price.is_empty() {
            return;
        }
        let entry = ProductPrice { name, price };
        if !prices.contains(&entry) {
            prices.push(entry);
        }
    };

    let item_name = selector("[itemprop=name]")?;
    let item_price = selector("[itemprop=price]")?;
    for product in document.select(&selector("[itemtype*=Product]")?) {
        let name = product.select(&item_name).next().map(itemprop_value);
        let price = product.select(&item_price).next().map(itemprop_value);
        if let (Some(name), Some(price)) = (name, price) {
            push(name, price);
        }
    }

    let container_name = selector(".name, .title, .product-name, h1, h2, h3, h4")?;
    let container_price = selector(".price")?;
    for product in document.select(&selector(".product")?) {
        let name = product
            .select(&container_name)
            .next()
            .map(|e| collapse_whitespace(&element_text(&e)));
        let price = product
            .select(&container_price)
            .next()
            .map(|e| collapse_whitespace(&element_text(&e)));
        if let (Some(name), Some(price)) = (name, price) {
            push(name, price);
        }
    }

    Ok(prices)
}

/// Microdata values live in `content` when present, otherwise in the text
fn itemprop_value(element: ElementRef) -> String {
    match element.value().attr("content") {
        Some(content) => collapse_whitespace(content),
        None => collapse_whitespace(&element_text(&element)),
    }
}
