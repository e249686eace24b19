use url::form_urlencoded;

/// The resources inlined into every post response.
const EMBED: &str = "author,wp:featuredmedia,wp:term";
/// WordPress rejects `per_page` greater than 100.
const MAX_PER_PAGE: u32 = 100;

/// A query of the `/wp/v2/posts` collection (or any custom post type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    page: u32,
    per_page: u32,
    categories: Vec<u64>,
    tags: Vec<u64>,
    search: Option<String>,
    slug: Option<String>,
    latest: bool,
    embed: bool,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl PostQuery {
    pub fn new() -> Self {
        PostQuery {
            page: 1,
            per_page: 10,
            categories: Vec::new(),
            tags: Vec::new(),
            search: None,
            slug: None,
            latest: false,
            embed: true,
        }
    }

    /// The 1-based page number.
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    pub fn category(mut self, id: u64) -> Self {
        self.categories.push(id);
        self
    }

    pub fn tag(mut self, id: u64) -> Self {
        self.tags.push(id);
        self
    }

    pub fn search(mut self, keyword: impl Into<String>) -> Self {
        self.search = Some(keyword.into());
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Order by publish date, newest first.
    pub fn latest(mut self) -> Self {
        self.latest = true;
        self
    }

    pub fn without_embed(mut self) -> Self {
        self.embed = false;
        self
    }

    pub fn page_number(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.per_page
    }

    /// Build the url encoded query string, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if self.embed {
            serializer.append_pair("_embed", EMBED);
        }
        if let Some(slug) = self.slug.as_deref() {
            serializer.append_pair("slug", slug);
        }
        if let Some(search) = self.search.as_deref() {
            serializer.append_pair("search", search);
        }
        if !self.categories.is_empty() {
            serializer.append_pair("categories", &join_ids(&self.categories));
        }
        if !self.tags.is_empty() {
            serializer.append_pair("tags", &join_ids(&self.tags));
        }
        serializer.append_pair("per_page", &self.per_page.to_string());
        serializer.append_pair("page", &self.page.to_string());
        if self.latest {
            serializer.append_pair("orderby", "date");
            serializer.append_pair("order", "desc");
        }
        serializer.finish()
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
