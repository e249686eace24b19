mod article;
mod listing;
mod magazine;
mod page;
mod post;

pub use article::{Article, Mapper, Tag, DESCRIPTION_LENGTH};
pub use listing::Listing;
pub use magazine::Magazine;
pub use page::{load_pages, Page};
pub use post::{
    Contributor, Embedded, EmbeddedAuthor, Rendered, WpCategory, WpMedia, WpPost, WpTerm,
};
