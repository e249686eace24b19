use std::borrow::Cow;

use serde::Serialize;

use crate::helpers::absolute_url;

/// The meta info of the HTML page, rendered into title,
/// OpenGraph and Twitter card tags.
#[derive(Debug, Default, Serialize)]
pub struct Meta<'a> {
    pub title: Cow<'a, str>,
    pub description: Cow<'a, str>,
    /// Absolute url of the page.
    pub url: Option<Cow<'a, str>>,
    pub image: Option<Cow<'a, str>>,
    /// The `og:type`, `website` if missing.
    pub kind: Option<&'static str>,
}

impl<'a> Meta<'a> {
    pub fn new(title: impl Into<Cow<'a, str>>, description: impl Into<Cow<'a, str>>) -> Self {
        let mut meta = Meta {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        };
        meta.truncate();
        meta
    }

    pub fn with_url(mut self, site_url: &str, path: &str) -> Self {
        self.url = Some(Cow::Owned(absolute_url(site_url, path)));
        self
    }

    pub fn with_image(mut self, image: impl Into<Cow<'a, str>>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn article(mut self) -> Self {
        self.kind = Some("article");
        self
    }

    fn truncate(&mut self) {
        truncate_chars(self.title.to_mut(), 200);
        truncate_chars(self.description.to_mut(), 200);
    }
}

// Truncate at a char boundary.
fn truncate_chars(text: &mut String, limit: usize) {
    if let Some((index, _)) = text.char_indices().nth(limit) {
        text.truncate(index);
    }
}
