//! Page classification and recrawl priority
//!
//! A page's keywords (or, failing that, its description) decide its site type;
//! the site type plus two adjustment factors decide the priority at which the
//! links discovered on it are scheduled.

use crate::storage::QueueTier;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

const NEWS_KEYWORDS: &[&str] = &[
    "news",
    "breaking",
    "update",
    "headline",
    "headlines",
    "report",
    "journalism",
];
const BLOG_KEYWORDS: &[&str] = &["blog", "post", "comment", "comments", "author", "posted"];
const ECOMMERCE_KEYWORDS: &[&str] = &[
    "buy", "shop", "price", "cart", "checkout", "product", "sale",
];
const SOCIAL_MEDIA_KEYWORDS: &[&str] = &[
    "social",
    "follow",
    "followers",
    "friends",
    "profile",
    "timeline",
];

/// Site-type label assigned to every crawled page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteType {
    News,
    Blog,
    Ecommerce,
    #[serde(rename = "socialmedia")]
    SocialMedia,
    Other,
}

impl SiteType {
    /// Labels tried by the classifier, in precedence order
    pub const PRECEDENCE: [SiteType; 4] = [
        SiteType::News,
        SiteType::Blog,
        SiteType::Ecommerce,
        SiteType::SocialMedia,
    ];

    /// Returns all labels
    pub fn all() -> [SiteType; 5] {
        [
            Self::News,
            Self::Blog,
            Self::Ecommerce,
            Self::SocialMedia,
            Self::Other,
        ]
    }

    /// Keywords that identify this label; empty for `Other`
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::News => NEWS_KEYWORDS,
            Self::Blog => BLOG_KEYWORDS,
            Self::Ecommerce => ECOMMERCE_KEYWORDS,
            Self::SocialMedia => SOCIAL_MEDIA_KEYWORDS,
            Self::Other => &[],
        }
    }

    /// Recrawl priority before adjustment
    ///
    /// Fast-changing content (news, social media) starts high, blogs and shops
    /// medium, everything else low.
    pub fn base_priority(&self) -> Priority {
        match self {
            Self::News | Self::SocialMedia => Priority::High,
            Self::Blog | Self::Ecommerce => Priority::Medium,
            Self::Other => Priority::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Blog => "blog",
            Self::Ecommerce => "ecommerce",
            Self::SocialMedia => "socialmedia",
            Self::Other => "other",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "news" => Some(Self::News),
            "blog" => Some(Self::Blog),
            "ecommerce" => Some(Self::Ecommerce),
            "socialmedia" => Some(Self::SocialMedia),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-level priority, used both for recrawl decisions and adjustment factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Contribution of this level when used as an adjustment factor
    pub fn adjustment(&self) -> i8 {
        match self {
            Self::High => 1,
            Self::Medium => 0,
            Self::Low => -1,
        }
    }

    /// The job queue tier links scheduled at this priority land in
    pub fn queue_tier(&self) -> QueueTier {
        match self {
            Self::High => QueueTier::High,
            Self::Medium | Self::Low => QueueTier::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a page from its keyword set and description
///
/// Labels are tried in [`SiteType::PRECEDENCE`] order, first against the
/// keyword set (exact word match), then as substrings of the lowercased
/// description. A page matching nothing is `Other`.
///
/// # Example
///
/// ```
/// use recrawler::crawler::{classify_site_type, SiteType};
/// use std::collections::BTreeSet;
///
/// let keywords = BTreeSet::from(["shop".to_string(), "blog".to_string()]);
/// assert_eq!(classify_site_type(&keywords, ""), SiteType::Blog);
/// ```
pub fn classify_site_type(keywords: &BTreeSet<String>, description: &str) -> SiteType {
    for site_type in SiteType::PRECEDENCE {
        let list = site_type.keywords();
        if keywords.iter().any(|keyword| list.contains(&keyword.as_str())) {
            return site_type;
        }
    }

    let description = description.to_lowercase();
    for site_type in SiteType::PRECEDENCE {
        if site_type
            .keywords()
            .iter()
            .any(|keyword| description.contains(keyword))
        {
            return site_type;
        }
    }

    SiteType::Other
}

/// Applies a net adjustment to a base priority
///
/// Moves at most one level: a high base only drops to medium, a low base only
/// rises to medium, and a medium base moves in the direction of the sign.
pub fn adjust_priority(base: Priority, adjustment: i8) -> Priority {
    match (base, adjustment.cmp(&0)) {
        (Priority::High, Ordering::Less) => Priority::Medium,
        (Priority::High, _) => Priority::High,
        (Priority::Medium, Ordering::Greater) => Priority::High,
        (Priority::Medium, Ordering::Less) => Priority::Low,
        (Priority::Medium, Ordering::Equal) => Priority::Medium,
        (Priority::Low, Ordering::Greater) => Priority::Medium,
        (Priority::Low, _) => Priority::Low,
    }
}

/// Decides the priority for links discovered on a page of `site_type`
pub fn recrawl_priority(
    site_type: SiteType,
    update_frequency: Priority,
    importance: Priority,
) -> Priority {
    let adjustment = update_frequency.adjustment() + importance.adjustment();
    adjust_priority(site_type.base_priority(), adjustment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_classify_by_keywords() {
        assert_eq!(
            classify_site_type(&keywords(&["breaking", "weather"]), ""),
            SiteType::News
        );
        assert_eq!(
            classify_site_type(&keywords(&["comment", "recipes"]), ""),
            SiteType::Blog
        );
        assert_eq!(
            classify_site_type(&keywords(&["cart"]), ""),
            SiteType::Ecommerce
        );
        assert_eq!(
            classify_site_type(&keywords(&["followers"]), ""),
            SiteType::SocialMedia
        );
    }

    #[test]
    fn test_precedence_news_first() {
        let all = keywords(&["followers", "shop", "blog", "news"]);
        assert_eq!(classify_site_type(&all, ""), SiteType::News);

        let no_news = keywords(&["followers", "shop", "blog"]);
        assert_eq!(classify_site_type(&no_news, ""), SiteType::Blog);

        let shop_and_social = keywords(&["followers", "shop"]);
        assert_eq!(classify_site_type(&shop_and_social, ""), SiteType::Ecommerce);
    }

    #[test]
    fn test_keywords_beat_description() {
        let result = classify_site_type(&keywords(&["checkout"]), "Latest news from town");
        assert_eq!(result, SiteType::Ecommerce);
    }

    #[test]
    fn test_description_fallback() {
        let empty = BTreeSet::new();
        assert_eq!(
            classify_site_type(&empty, "The BREAKING stories of today"),
            SiteType::News
        );
        assert_eq!(
            classify_site_type(&empty, "Follow our friends"),
            SiteType::SocialMedia
        );
    }

    #[test]
    fn test_other_when_nothing_matches() {
        assert_eq!(
            classify_site_type(&keywords(&["weather", "garden"]), "A quiet place"),
            SiteType::Other
        );
    }

    #[test]
    fn test_site_type_db_roundtrip() {
        for site_type in SiteType::all() {
            assert_eq!(SiteType::from_db_string(site_type.as_str()), Some(site_type));
        }
        assert_eq!(SiteType::from_db_string("forum"), None);
    }

    #[test]
    fn test_base_priorities() {
        assert_eq!(SiteType::News.base_priority(), Priority::High);
        assert_eq!(SiteType::SocialMedia.base_priority(), Priority::High);
        assert_eq!(SiteType::Blog.base_priority(), Priority::Medium);
        assert_eq!(SiteType::Ecommerce.base_priority(), Priority::Medium);
        assert_eq!(SiteType::Other.base_priority(), Priority::Low);
    }

    #[test]
    fn test_adjust_priority_table() {
        use Priority::*;

        // (base, net adjustment, expected)
        let table = [
            (High, -2, Medium),
            (High, -1, Medium),
            (High, 0, High),
            (High, 1, High),
            (High, 2, High),
            (Medium, -2, Low),
            (Medium, -1, Low),
            (Medium, 0, Medium),
            (Medium, 1, High),
            (Medium, 2, High),
            (Low, -2, Low),
            (Low, -1, Low),
            (Low, 0, Low),
            (Low, 1, Medium),
            (Low, 2, Medium),
        ];

        for (base, adjustment, expected) in table {
            assert_eq!(
                adjust_priority(base, adjustment),
                expected,
                "base {} with adjustment {}",
                base,
                adjustment
            );
        }
    }

    #[test]
    fn test_recrawl_priority_exhaustive() {
        use Priority::*;

        // Rows: update-frequency high, medium, low.
        // Columns: importance high, medium, low.
        let high_base = [
            [High, High, High],
            [High, High, Medium],
            [High, Medium, Medium],
        ];
        let medium_base = [
            [High, High, Medium],
            [High, Medium, Low],
            [Medium, Low, Low],
        ];
        let low_base = [
            [Medium, Medium, Low],
            [Medium, Low, Low],
            [Low, Low, Low],
        ];
        let expected = [
            (SiteType::News, high_base),
            (SiteType::SocialMedia, high_base),
            (SiteType::Blog, medium_base),
            (SiteType::Ecommerce, medium_base),
            (SiteType::Other, low_base),
        ];
        assert_eq!(expected.len(), SiteType::all().len());

        let levels = [High, Medium, Low];
        let mut checked = 0;
        for (site_type, table) in expected {
            for (row, update_frequency) in levels.into_iter().enumerate() {
                for (col, importance) in levels.into_iter().enumerate() {
                    assert_eq!(
                        recrawl_priority(site_type, update_frequency, importance),
                        table[row][col],
                        "{} with update-frequency {} and importance {}",
                        site_type,
                        update_frequency,
                        importance
                    );
                    checked += 1;
                }
            }
        }
        assert_eq!(checked, 45);
    }

    #[test]
    fn test_recrawl_priority_spot_checks() {
        use Priority::*;

        assert_eq!(recrawl_priority(SiteType::News, Medium, Medium), High);
        assert_eq!(recrawl_priority(SiteType::News, Low, Low), Medium);
        assert_eq!(recrawl_priority(SiteType::Blog, High, Low), Medium);
        assert_eq!(recrawl_priority(SiteType::Blog, High, Medium), High);
        assert_eq!(recrawl_priority(SiteType::Ecommerce, Low, Medium), Low);
        assert_eq!(recrawl_priority(SiteType::Other, High, High), Medium);
        assert_eq!(recrawl_priority(SiteType::Other, Medium, Medium), Low);
    }

    #[test]
    fn test_queue_tiers() {
        assert_eq!(Priority::High.queue_tier(), QueueTier::High);
        assert_eq!(Priority::Medium.queue_tier(), QueueTier::Low);
        assert_eq!(Priority::Low.queue_tier(), QueueTier::Low);
    }

    #[test]
    fn test_adjustments() {
        assert_eq!(Priority::High.adjustment(), 1);
        assert_eq!(Priority::Medium.adjustment(), 0);
        assert_eq!(Priority::Low.adjustment(), -1);
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
