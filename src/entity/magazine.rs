use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    helpers::{parse_wp_datetime, time_ago},
    html::to_plain_text,
};

use super::WpPost;

/// A magazine issue card.
#[derive(Debug, Clone, Serialize)]
pub struct Magazine {
    pub id: u64,
    pub slug: String,
    pub title: String,
    pub image: String,
    /// Like `#ISSUE 07 2 months ago`.
    pub issue: String,
    /// The raw excerpt HTML.
    pub excerpt: String,
}

impl Magazine {
    /// Map a post of the magazine post type.
    ///
    /// Issues without featured media take the `images` in turn,
    /// then the `placeholder`.
    pub fn from_post(
        post: &WpPost,
        index: usize,
        images: &[String],
        placeholder: &str,
        now: OffsetDateTime,
    ) -> Self {
        let image = post
            .featured_image()
            .map(str::to_owned)
            .or_else(|| images.get(index % images.len().max(1)).cloned())
            .unwrap_or_else(|| placeholder.to_owned());
        let published = parse_wp_datetime(post.date_gmt.as_deref(), &post.date)
            .map(|published| format!(" {}", time_ago(published, now).to_lowercase()))
            .unwrap_or_default();

        Magazine {
            id: post.id,
            slug: post.slug.clone(),
            title: to_plain_text(&post.title.rendered),
            image,
            issue: format!("#ISSUE {:02}{published}", post.id),
            excerpt: post.excerpt.rendered.clone(),
        }
    }
}
