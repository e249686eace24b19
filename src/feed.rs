use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{entity::Article, helpers::absolute_url};

/// An entry of the Atom feed.
#[derive(Debug, Serialize)]
pub struct FeedEntry<'a> {
    pub title: &'a str,
    pub url: String,
    pub summary: &'a str,
    pub author: &'a str,
    pub category: &'a str,
    /// RFC 3339 update time.
    pub date: String,
}

/// An url of the sitemap.
#[derive(Debug, Serialize)]
pub struct SitemapEntry {
    pub url: String,
    /// Like `2025-09-12`.
    pub lastmod: Option<String>,
}

impl<'a> FeedEntry<'a> {
    pub fn new(site_url: &str, article: &'a Article, fallback_date: OffsetDateTime) -> Self {
        FeedEntry {
            title: &article.title,
            url: absolute_url(site_url, &article.path()),
            summary: &article.description,
            author: &article.author,
            category: &article.category,
            date: format_rfc3339(article.published.unwrap_or(fallback_date)),
        }
    }
}

impl SitemapEntry {
    pub fn new(site_url: &str, path: &str, lastmod: Option<OffsetDateTime>) -> Self {
        SitemapEntry {
            url: absolute_url(site_url, path),
            lastmod: lastmod.map(|date| date.date().to_string()),
        }
    }
}

/// The latest update time of the feed.
pub fn feed_updated(articles: &[Article], fallback: OffsetDateTime) -> String {
    format_rfc3339(
        articles
            .iter()
            .filter_map(|article| article.published)
            .max()
            .unwrap_or(fallback),
    )
}

fn format_rfc3339(date: OffsetDateTime) -> String {
    date.format(&Rfc3339).unwrap_or_default()
}
