use std::{str::FromStr, time::Duration};

use hyper::{
    body::Bytes,
    client::HttpConnector,
    header::{HeaderMap, ACCEPT, USER_AGENT},
    Body, Client, Request, StatusCode, Uri,
};
use hyper_tls::HttpsConnector;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    config::WordPress,
    entity::{Contributor, WpCategory, WpMedia, WpPost},
    error::WpError,
};

use super::PostQuery;

const TOTAL_HEADER: &str = "x-wp-total";
const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";
/// Stop paging the category list after this many pages.
const MAX_CATEGORY_PAGES: u32 = 10;

/// One page of a WordPress collection.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    /// The `X-WP-Total` header.
    pub total: Option<u64>,
    /// The `X-WP-TotalPages` header.
    pub total_pages: Option<u32>,
}

impl<T> Paged<T> {
    pub fn empty(page: u32, per_page: u32) -> Self {
        Paged {
            items: Vec::new(),
            page,
            per_page,
            total: None,
            total_pages: None,
        }
    }

    /// Whether a next page exists.
    ///
    /// Without pagination headers, a full page means there may be more.
    pub fn has_more(&self) -> bool {
        match self.total_pages {
            Some(total_pages) => self.page < total_pages,
            None => self.per_page > 0 && self.items.len() == self.per_page as usize,
        }
    }
}

/// A read-only client of the WordPress REST API.
#[derive(Clone)]
pub struct WpClient {
    client: Client<HttpsConnector<HttpConnector>>,
    api_url: String,
    contributors_path: String,
    timeout: Duration,
}

impl WpClient {
    pub fn new(config: &WordPress) -> Self {
        let client = Client::builder().build::<_, Body>(HttpsConnector::new());
        WpClient {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            contributors_path: config.contributors_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// List posts of the `posts` type.
    pub async fn posts(&self, query: &PostQuery) -> Result<Paged<WpPost>, WpError> {
        self.post_type("posts", query).await
    }

    /// List posts of any post type, such as the custom `magazine` type.
    ///
    /// WordPress answers `400` for a page beyond the last one,
    /// which is treated as an empty last page.
    pub async fn post_type(
        &self,
        post_type: &str,
        query: &PostQuery,
    ) -> Result<Paged<WpPost>, WpError> {
        let path = format!("/wp/v2/{post_type}");
        match self.fetch(&path, &query.to_query_string()).await {
            Ok((headers, body)) => Ok(Paged {
                items: self.decode(&path, &body)?,
                page: query.page_number(),
                per_page: query.page_size(),
                total: parse_header(&headers, TOTAL_HEADER),
                total_pages: parse_header(&headers, TOTAL_PAGES_HEADER),
            }),
            Err(WpError::Status { status, .. })
                if status == StatusCode::BAD_REQUEST && query.page_number() > 1 =>
            {
                debug!("Page {} of `{path}` is out of range", query.page_number());
                Ok(Paged::empty(query.page_number(), query.page_size()))
            }
            Err(err) => Err(err),
        }
    }

    /// Find a post by its slug, fallback to search the slug if no post matched.
    pub async fn post_by_slug(&self, slug: &str) -> Result<WpPost, WpError> {
        let by_slug = self.posts(&PostQuery::new().slug(slug).per_page(1)).await?;
        if let Some(post) = by_slug.items.into_iter().next() {
            return Ok(post);
        }

        debug!("No post has slug `{slug}`, search it instead");
        let keyword = slug.replace('-', " ");
        self.posts(&PostQuery::new().search(keyword).per_page(1))
            .await?
            .items
            .into_iter()
            .next()
            .ok_or_else(|| WpError::NotFound(format!("Article `{slug}`")))
    }

    /// All categories, following the pagination headers.
    pub async fn categories(&self) -> Result<Vec<WpCategory>, WpError> {
        let path = "/wp/v2/categories";
        let mut categories = Vec::new();
        let mut page = 1;
        loop {
            let (headers, body) = self
                .fetch(path, &format!("per_page=100&page={page}"))
                .await?;
            categories.extend(self.decode::<Vec<WpCategory>>(path, &body)?);

            let total_pages = parse_header::<u32>(&headers, TOTAL_PAGES_HEADER).unwrap_or(1);
            if page >= total_pages {
                break;
            }
            if page >= MAX_CATEGORY_PAGES {
                warn!("Stop listing categories after {MAX_CATEGORY_PAGES} pages");
                break;
            }
            page += 1;
        }
        Ok(categories)
    }

    pub async fn category_by_slug(&self, slug: &str) -> Result<Option<WpCategory>, WpError> {
        let path = "/wp/v2/categories";
        let query = form_query(&[("slug", slug)]);
        let (_, body) = self.fetch(path, &query).await?;
        Ok(self
            .decode::<Vec<WpCategory>>(path, &body)?
            .into_iter()
            .next())
    }

    pub async fn media(&self, id: u64) -> Result<WpMedia, WpError> {
        self.get_json(&format!("/wp/v2/media/{id}"), "").await
    }

    pub async fn contributors(&self) -> Result<Vec<Contributor>, WpError> {
        self.get_json(&self.contributors_path, "").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T, WpError> {
        let (_, body) = self.fetch(path, query).await?;
        self.decode(path, &body)
    }

    fn decode<T: DeserializeOwned>(&self, path: &str, body: &[u8]) -> Result<T, WpError> {
        serde_json::from_slice(body).map_err(|source| WpError::Json {
            url: format!("{}{path}", self.api_url),
            source,
        })
    }

    // Issue a GET request, any non-success status is an error.
    async fn fetch(&self, path: &str, query: &str) -> Result<(HeaderMap, Bytes), WpError> {
        let url = if query.is_empty() {
            format!("{}{path}", self.api_url)
        } else {
            format!("{}{path}?{query}", self.api_url)
        };
        let uri = url
            .parse::<Uri>()
            .map_err(|_| WpError::InvalidUri(url.clone()))?;
        let req = Request::get(uri)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("streetpress/", env!("CARGO_PKG_VERSION")))
            .body(Body::empty())
            .map_err(|_| WpError::InvalidUri(url.clone()))?;

        debug!("GET {url}");
        // The timeout bounds the whole exchange, a stalled body included.
        let (status, headers, body) = tokio::time::timeout(self.timeout, async {
            let resp = self.client.request(req).await?;
            let status = resp.status();
            let headers = resp.headers().clone();
            let body = hyper::body::to_bytes(resp.into_body()).await?;
            Ok::<_, hyper::Error>((status, headers, body))
        })
        .await
        .map_err(|_| WpError::Timeout(url.clone()))??;

        if !status.is_success() {
            return Err(WpError::Status { status, url });
        }
        Ok((headers, body))
    }
}

fn parse_header<T: FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn form_query(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
