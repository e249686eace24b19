use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    config::{Section, Theme},
    helpers::{format_long_date, parse_wp_datetime, time_ago},
    html::{extract_description, to_plain_text},
};

use super::{WpCategory, WpPost, WpTerm};

/// The length of the description used by meta tags.
pub const DESCRIPTION_LENGTH: usize = 160;

/// The flattened view of a WordPress post rendered by templates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Article {
    pub id: u64,
    pub slug: String,
    /// Plain text title, entities decoded.
    pub title: String,
    /// The raw content HTML.
    pub content: String,
    /// The raw excerpt HTML.
    pub excerpt: String,
    pub image: String,
    /// The contributor name.
    pub author: String,
    pub author_id: Option<u64>,
    /// Upper-cased category name.
    pub category: String,
    pub tags: Vec<Tag>,
    /// Like `September 12, 2025`.
    pub date: String,
    /// Like `5 MINS AGO`.
    pub time: String,
    pub description: String,
    #[serde(skip)]
    pub published: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

impl From<&WpTerm> for Tag {
    fn from(term: &WpTerm) -> Self {
        Tag {
            id: term.id,
            name: to_plain_text(&term.name),
            slug: term.slug.clone(),
        }
    }
}

impl Article {
    /// The headline ticker text: `CATEGORY: title`.
    pub fn headline(&self) -> String {
        format!("{}: {}", self.category, self.title)
    }

    /// The internal route of this article.
    pub fn path(&self) -> String {
        format!("/{}", self.slug)
    }
}

/// Map WordPress posts to [`Article`]s.
///
/// Every missing field falls back to the section defaults first,
/// then the theme defaults. Mapping never fails.
#[derive(Clone)]
pub struct Mapper<'a> {
    contributors: Arc<HashMap<u64, String>>,
    categories: Arc<Vec<WpCategory>>,
    theme: &'a Theme,
    section: Option<&'a Section>,
    now: OffsetDateTime,
}

impl<'a> Mapper<'a> {
    pub fn new(
        contributors: Arc<HashMap<u64, String>>,
        categories: Arc<Vec<WpCategory>>,
        theme: &'a Theme,
    ) -> Self {
        Mapper {
            contributors,
            categories,
            theme,
            section: None,
            now: OffsetDateTime::now_utc(),
        }
    }

    /// Apply the defaults of the `section`.
    pub fn with_section(mut self, section: &'a Section) -> Self {
        self.section = Some(section);
        self
    }

    pub fn with_now(mut self, now: OffsetDateTime) -> Self {
        self.now = now;
        self
    }

    /// Map a list of posts, `offset` is the position of the first post
    /// within the whole listing, used to rotate fallback images.
    pub fn map_all(&self, posts: &[WpPost], offset: usize) -> Vec<Article> {
        posts
            .iter()
            .enumerate()
            .map(|(index, post)| self.map(post, offset + index))
            .collect()
    }

    pub fn map(&self, post: &WpPost, index: usize) -> Article {
        let published = parse_wp_datetime(post.date_gmt.as_deref(), &post.date);
        let description_source = if to_plain_text(&post.excerpt.rendered).is_empty() {
            &post.content.rendered
        } else {
            &post.excerpt.rendered
        };

        Article {
            id: post.id,
            slug: post.slug.clone(),
            title: to_plain_text(&post.title.rendered),
            content: post.content.rendered.clone(),
            excerpt: post.excerpt.rendered.clone(),
            image: self.image(post, index),
            author: self.author(post),
            author_id: post.author_id(),
            category: self.category(post),
            tags: post.tag_terms().iter().map(Tag::from).collect(),
            date: published.map(format_long_date).unwrap_or_default(),
            time: published
                .map(|published| time_ago(published, self.now))
                .unwrap_or_default(),
            description: extract_description(description_source, DESCRIPTION_LENGTH),
            published,
        }
    }

    fn image(&self, post: &WpPost, index: usize) -> String {
        if let Some(image) = post.featured_image() {
            return image.to_owned();
        }
        self.section
            .map(|section| &section.fallback_images)
            .filter(|images| !images.is_empty())
            .map(|images| images[index % images.len()].clone())
            .unwrap_or_else(|| self.theme.placeholder_image.clone())
    }

    fn author(&self, post: &WpPost) -> String {
        post.author_id()
            .and_then(|id| self.contributors.get(&id))
            .map(String::as_str)
            .filter(|name| !name.trim().is_empty())
            .or_else(|| post.embedded_author())
            .or_else(|| self.section.and_then(|s| s.default_author.as_deref()))
            .unwrap_or(&self.theme.default_author)
            .to_owned()
    }

    fn category(&self, post: &WpPost) -> String {
        if let Some(term) = post
            .category_terms()
            .iter()
            .find(|term| !term.name.trim().is_empty())
        {
            return to_plain_text(&term.name).to_uppercase();
        }

        self.categories
            .iter()
            .find(|category| post.categories.contains(&category.id))
            .map(|category| to_plain_text(&category.name).to_uppercase())
            .or_else(|| {
                self.section
                    .and_then(|section| section.default_category.clone())
            })
            .unwrap_or_else(|| self.theme.default_category.clone())
    }
}
