use serde::{de, Deserialize, Deserializer, Serialize};

/// A post as served by the WordPress REST API.
///
/// Only the fields used by the site are kept, everything is optional
/// enough to accept custom post types such as `magazine`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WpPost {
    pub id: u64,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub date: String,
    pub date_gmt: Option<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    /// The user id, `0` or missing if the post has no author.
    pub author: Option<u64>,
    pub featured_media: Option<u64>,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default)]
    pub tags: Vec<u64>,
    #[serde(rename = "_embedded")]
    #[serde(default)]
    pub embedded: Embedded,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// The resources inlined by the `_embed` parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Embedded {
    #[serde(default)]
    pub author: Vec<EmbeddedAuthor>,
    #[serde(rename = "wp:featuredmedia")]
    #[serde(default)]
    pub featured_media: Vec<WpMedia>,
    /// Term groups, categories first then tags.
    #[serde(rename = "wp:term")]
    #[serde(default)]
    pub terms: Vec<Vec<WpTerm>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddedAuthor {
    // Missing if WordPress embeds an error object instead.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WpTerm {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub taxonomy: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WpCategory {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub parent: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WpMedia {
    #[serde(default)]
    pub id: u64,
    pub source_url: Option<String>,
    #[serde(default)]
    pub alt_text: String,
}

/// A record of the custom contributors endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,
    pub name: String,
}

impl WpPost {
    /// The source url of the first embedded featured media.
    pub fn featured_image(&self) -> Option<&str> {
        self.embedded
            .featured_media
            .first()
            .and_then(|media| media.source_url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }

    /// The featured media id when WordPress didn't embed the media itself.
    pub fn unembedded_media(&self) -> Option<u64> {
        self.featured_media
            .filter(|id| *id != 0 && self.featured_image().is_none())
    }

    /// The name of the first embedded author.
    pub fn embedded_author(&self) -> Option<&str> {
        self.embedded
            .author
            .first()
            .and_then(|author| author.name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }

    /// The category terms, which is always the first term group.
    pub fn category_terms(&self) -> &[WpTerm] {
        self.embedded
            .terms
            .first()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The term group whose first term is a `post_tag`.
    pub fn tag_terms(&self) -> &[WpTerm] {
        self.embedded
            .terms
            .iter()
            .find(|group| matches!(group.first(), Some(term) if term.taxonomy == "post_tag"))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The author id, `None` for the anonymous `0`.
    pub fn author_id(&self) -> Option<u64> {
        self.author.filter(|id| *id != 0)
    }
}

// Some custom endpoints serialize ids as strings.
fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        String(String),
    }

    match Id::deserialize(deserializer)? {
        Id::Number(id) => Ok(id),
        Id::String(id) => id.trim().parse().map_err(de::Error::custom),
    }
}
