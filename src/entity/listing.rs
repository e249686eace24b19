use serde::Serialize;

use crate::wordpress::Paged;

use super::{Article, Mapper, WpPost};

/// One page of articles of a section, a search or a tag.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Listing {
    pub articles: Vec<Article>,
    pub page: u32,
    pub total_pages: Option<u32>,
    pub total: Option<u64>,
    pub has_more: bool,
    pub next_page: Option<u32>,
}

impl Listing {
    pub fn new(paged: &Paged<WpPost>, mapper: &Mapper) -> Self {
        let offset = paged.page.saturating_sub(1) as usize * paged.per_page as usize;
        let has_more = paged.has_more();
        Listing {
            articles: mapper.map_all(&paged.items, offset),
            page: paged.page,
            total_pages: paged.total_pages,
            total: paged.total,
            has_more,
            next_page: has_more.then_some(paged.page + 1),
        }
    }
}
