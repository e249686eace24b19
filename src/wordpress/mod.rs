//! The WordPress REST API, read-only.

mod client;
mod query;

pub use client::{Paged, WpClient};
pub use query::PostQuery;
