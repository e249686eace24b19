use std::{collections::BTreeMap, path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use futures::future::join_all;
use hyper::StatusCode;
use minijinja::context;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

use crate::{
    config::{BlockStyle, Config, Section},
    data,
    engine::Engine,
    entity::{self, load_pages, Article, Listing, Mapper, Page, WpPost},
    error::WpError,
    feed::{feed_updated, FeedEntry, SitemapEntry},
    helpers::{absolute_url, parse_wp_datetime},
    html,
    meta::Meta,
    routes::{page_url, Route},
    wordpress::{Paged, PostQuery, WpClient},
};

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";
const ATOM: &str = "application/atom+xml; charset=utf-8";
const XML: &str = "application/xml; charset=utf-8";

const SEARCH_PER_PAGE: u32 = 9;
const RELATED_COUNT: u32 = 6;
const FEED_SIZE: u32 = 20;
const SITEMAP_POSTS: u32 = 50;

/// A rendered response.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn html(status: StatusCode, body: String) -> Self {
        Reply {
            status,
            content_type: HTML,
            body,
        }
    }

    fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Reply {
            status,
            content_type: TEXT,
            body: body.into(),
        }
    }
}

/// The share links of an article.
#[derive(Debug, Serialize)]
struct ShareLinks {
    url: String,
    twitter: String,
    facebook: String,
    whatsapp: String,
}

impl ShareLinks {
    fn new(url: String, title: &str) -> Self {
        let encode = |pairs: &[(&str, &str)]| {
            form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish()
        };
        ShareLinks {
            twitter: format!(
                "https://twitter.com/intent/tweet?{}",
                encode(&[("url", &url), ("text", title)])
            ),
            facebook: format!(
                "https://www.facebook.com/sharer/sharer.php?{}",
                encode(&[("u", &url)])
            ),
            whatsapp: format!(
                "https://wa.me/?{}",
                encode(&[("text", &format!("{title} {url}"))])
            ),
            url,
        }
    }
}

#[derive(Serialize)]
struct HomeBlockView<'a> {
    title: &'a str,
    path: String,
    style: BlockStyle,
    articles: Vec<Article>,
}

// What a listing page shows around its cards.
struct ListingPage<'a> {
    path: String,
    params: Vec<(&'static str, &'a str)>,
    page: u32,
    title: String,
    label: &'a str,
    description: &'a str,
    search: Option<&'a str>,
}

/// The server-rendered site, every route of it.
pub struct Site {
    config: Config,
    client: WpClient,
    engine: Engine,
    pages: BTreeMap<String, Page>,
    wordpress_host: Option<String>,
}

impl Site {
    pub fn new(source: &Path, config: Config) -> Result<Self> {
        let pages = load_pages(&source.join("pages"))?;
        info!("Loaded {} local pages", pages.len());
        data::load(Duration::from_secs(config.wordpress.cache_ttl_secs));

        Ok(Site {
            client: WpClient::new(&config.wordpress),
            engine: Engine::new(&config)?,
            wordpress_host: config.wordpress_host(),
            pages,
            config,
        })
    }

    pub fn route(&self, path: &str, query: Option<&str>) -> Route {
        Route::resolve(
            &self.config,
            |slug| self.pages.contains_key(slug),
            path,
            query,
        )
    }

    /// Render the page of `path`. Never fails, a broken page is a 500 page.
    pub async fn handle(&self, path: &str, query: Option<&str>) -> Reply {
        let route = self.route(path, query);
        debug!("Resolved `{path}` to {route:?}");

        let result = match route {
            Route::Home => self.home().await,
            Route::Health => Ok(Reply::text(StatusCode::OK, "ok")),
            Route::Feed => self.feed().await,
            Route::Sitemap => self.sitemap().await,
            Route::Search {
                query,
                page,
                partial,
            } => self.search(&query, page, partial).await,
            Route::Section {
                slug,
                page,
                partial,
            } => self.section(&slug, page, partial).await,
            Route::Magazine => self.magazine().await,
            Route::Page(slug) => self.page(&slug).await,
            Route::Article { slug, tag } => self.article(&slug, tag).await,
            Route::NotFound => self.not_found().await,
        };
        result.unwrap_or_else(|err| {
            error!("Failed to render `{path}`: {err:?}");
            self.server_error()
        })
    }

    async fn mapper(&self) -> Mapper<'_> {
        let data = data::get();
        let (contributors, categories) = futures::join!(
            data.contributors(&self.client),
            data.categories(&self.client)
        );
        Mapper::new(contributors, categories, &self.config.theme)
    }

    /// The headline ticker: the latest post titles prefixed by their category.
    async fn headlines(&self) -> Arc<Vec<String>> {
        let data = data::get();
        if let Some(headlines) = data.headlines() {
            return headlines;
        }

        let query = PostQuery::new()
            .latest()
            .per_page(self.config.headline.count);
        let (mapper, posts) = futures::join!(self.mapper(), self.client.posts(&query));
        match posts {
            Ok(paged) if !paged.items.is_empty() => data.set_headlines(
                mapper
                    .map_all(&paged.items, 0)
                    .iter()
                    .map(Article::headline)
                    .collect(),
            ),
            Ok(_) => self.fallback_headlines(),
            Err(err) => {
                warn!("Failed to fetch headlines: {err}");
                self.fallback_headlines()
            }
        }
    }

    fn fallback_headlines(&self) -> Arc<Vec<String>> {
        data::get()
            .stale_headlines()
            .unwrap_or_else(|| Arc::new(self.config.headline.fallback.clone()))
    }

    async fn page_headlines(&self, partial: bool) -> Arc<Vec<String>> {
        if partial {
            Arc::default()
        } else {
            self.headlines().await
        }
    }

    // Resolve the WordPress category of the section, by slug first,
    // then by searching the category list with the keywords.
    async fn resolve_category(&self, section: &Section) -> Result<Option<u64>, WpError> {
        if let Some(id) = section.category_id {
            return Ok(Some(id));
        }
        let Some(slug) = section.category.as_deref() else {
            return Ok(None);
        };

        let data = data::get();
        if let Some(category) = data.category_by_slug(&self.client, slug).await? {
            return Ok(Some(category.id));
        }
        if section.match_keywords.is_empty() {
            warn!("No category has slug `{slug}`");
            return Ok(None);
        }

        let keywords = section
            .match_keywords
            .iter()
            .map(|keyword| keyword.to_lowercase())
            .collect::<Vec<_>>();
        let category = data
            .categories(&self.client)
            .await
            .iter()
            .find(|category| {
                let name = category.name.to_lowercase();
                let slug = category.slug.to_lowercase();
                keywords
                    .iter()
                    .any(|keyword| name.contains(keyword) || slug.contains(keyword))
            })
            .map(|category| category.id);
        if category.is_none() {
            warn!("No category matches the keywords of section `{}`", section.slug);
        }
        Ok(category)
    }

    async fn fetch_section(
        &self,
        section: &Section,
        page: u32,
        per_page: u32,
    ) -> Result<Paged<WpPost>, WpError> {
        let latest = PostQuery::new().latest().page(page).per_page(per_page);
        match self.resolve_category(section).await? {
            Some(category) => {
                let paged = self.client.posts(&latest.clone().category(category)).await?;
                if paged.items.is_empty() && page == 1 && section.fallback_to_latest {
                    info!(
                        "Category {category} of section `{}` is empty, list the latest posts",
                        section.slug
                    );
                    return self.client.posts(&latest).await;
                }
                Ok(paged)
            }
            None if section.category.is_some() && !section.fallback_to_latest => {
                Ok(Paged::empty(page, per_page))
            }
            None => self.client.posts(&latest).await,
        }
    }

    async fn home(&self) -> Result<Reply> {
        let home = &self.config.home;
        let latest_query = PostQuery::new()
            .latest()
            .per_page(home.latest_fetch_count() as u32);
        let blocks = home
            .blocks
            .iter()
            .filter_map(|block| Some((block, self.config.section(&block.section)?)))
            .collect::<Vec<_>>();

        let (mapper, latest, block_posts, headlines) = futures::join!(
            self.mapper(),
            self.client.posts(&latest_query),
            join_all(
                blocks
                    .iter()
                    .map(|(block, section)| self.fetch_section(section, 1, block.count as u32))
            ),
            self.headlines(),
        );

        let (posts, failed) = match latest {
            Ok(paged) => (paged.items, false),
            Err(err) => {
                warn!("Failed to fetch the latest posts: {err}");
                (Vec::new(), true)
            }
        };
        let articles = mapper.map_all(&posts, 0);
        let hero = articles.iter().take(home.hero_count).collect::<Vec<_>>();
        let sidebar = articles
            .iter()
            .skip(home.sidebar_exclude)
            .take(home.sidebar_count)
            .collect::<Vec<_>>();
        let latest = articles.iter().take(home.latest_count).collect::<Vec<_>>();

        let blocks = blocks
            .into_iter()
            .zip(block_posts)
            .map(|((block, section), posts)| {
                let posts = posts.map(|paged| paged.items).unwrap_or_else(|err| {
                    warn!("Failed to fetch the home block `{}`: {err}", section.slug);
                    Vec::new()
                });
                let mut articles = mapper.clone().with_section(section).map_all(&posts, 0);
                articles.truncate(block.count);
                HomeBlockView {
                    title: block.title.as_deref().unwrap_or(&section.title),
                    path: section.path(),
                    style: block.style,
                    articles,
                }
            })
            .collect::<Vec<_>>();

        let site = &self.config.site;
        let meta = Meta::new(site.name.as_str(), site.description.as_deref().unwrap_or_default())
            .with_url(&site.url, "/");
        let body = self.engine.render(
            "index.html",
            context! {
                meta => meta,
                error => failed,
                hero => hero,
                sidebar => sidebar,
                latest_title => &home.latest_title,
                latest => latest,
                blocks => blocks,
                headlines => headlines,
            },
        )?;
        let status = if failed {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::OK
        };
        Ok(Reply::html(status, body))
    }

    async fn section(&self, slug: &str, page: u32, partial: bool) -> Result<Reply> {
        let Some(section) = self.config.section(slug) else {
            return self.not_found().await;
        };

        let (mapper, paged, headlines) = futures::join!(
            self.mapper(),
            self.fetch_section(section, page, section.per_page),
            self.page_headlines(partial),
        );
        let mapper = mapper.with_section(section);
        let listing = paged.map(|paged| Listing::new(&paged, &mapper));

        let description = format!("{} | {}", section.title, self.config.site.name);
        self.render_listing(
            ListingPage {
                path: section.path(),
                params: Vec::new(),
                page,
                title: section.title.clone(),
                label: &section.label,
                description: &description,
                search: None,
            },
            listing,
            partial,
            headlines,
        )
    }

    async fn search(&self, query: &str, page: u32, partial: bool) -> Result<Reply> {
        let fetch = async {
            if query.is_empty() {
                Ok(Paged::empty(page, SEARCH_PER_PAGE))
            } else {
                self.client
                    .posts(
                        &PostQuery::new()
                            .search(query)
                            .page(page)
                            .per_page(SEARCH_PER_PAGE),
                    )
                    .await
            }
        };
        let (mapper, paged, headlines) =
            futures::join!(self.mapper(), fetch, self.page_headlines(partial));
        let listing = paged.map(|paged| Listing::new(&paged, &mapper));

        let search_title = self.engine.fluent("search-title");
        let title = if query.is_empty() {
            search_title.clone()
        } else {
            format!("{search_title}: {query}")
        };
        self.render_listing(
            ListingPage {
                path: "/search".into(),
                params: vec![("q", query)],
                page,
                title,
                label: &search_title,
                description: query,
                search: Some(query),
            },
            listing,
            partial,
            headlines,
        )
    }

    fn render_listing(
        &self,
        page: ListingPage<'_>,
        listing: Result<Listing, WpError>,
        partial: bool,
        headlines: Arc<Vec<String>>,
    ) -> Result<Reply> {
        let (listing, error, status) = match listing {
            Ok(listing) => (listing, None, StatusCode::OK),
            Err(err) => {
                warn!("Failed to fetch the listing of `{}`: {err}", page.path);
                let listing = Listing {
                    page: page.page,
                    ..Default::default()
                };
                (
                    listing,
                    Some(self.engine.fluent("fetch-failed")),
                    StatusCode::BAD_GATEWAY,
                )
            }
        };
        let next_url = listing
            .next_page
            .map(|next| page_url(&page.path, &page.params, next));

        if partial {
            if let Some(error) = error {
                return Ok(Reply::text(status, error));
            }
            let body = self.engine.render(
                "_cards.html",
                context! {
                    listing => listing,
                    next_url => next_url,
                },
            )?;
            return Ok(Reply::html(status, body));
        }

        let site = &self.config.site;
        let url = page_url(&page.path, &page.params, page.page);
        let meta = Meta::new(format!("{} | {}", page.title, site.name), page.description)
            .with_url(&site.url, &url);
        let body = self.engine.render(
            "listing.html",
            context! {
                meta => meta,
                title => page.title,
                label => page.label,
                listing => listing,
                next_url => next_url,
                error => error,
                retry_url => url,
                search => page.search.is_some(),
                query => page.search,
                headlines => headlines,
            },
        )?;
        Ok(Reply::html(status, body))
    }

    async fn article(&self, slug: &str, tag: Option<u64>) -> Result<Reply> {
        let related = async {
            match tag {
                Some(tag) => self
                    .client
                    .posts(&PostQuery::new().tag(tag).latest().per_page(RELATED_COUNT))
                    .await
                    .map(|paged| paged.items),
                None => Ok(Vec::new()),
            }
        };
        let (mapper, post, related, headlines) = futures::join!(
            self.mapper(),
            self.client.post_by_slug(slug),
            related,
            self.headlines(),
        );

        let post = match post {
            Ok(post) => post,
            Err(err) if err.is_not_found() => {
                info!("Article `{slug}` not found");
                return self.error_page(
                    StatusCode::NOT_FOUND,
                    "article-not-found",
                    "article-not-found-message",
                    headlines,
                );
            }
            Err(err) => {
                warn!("Failed to fetch article `{slug}`: {err}");
                return self.error_page(
                    StatusCode::BAD_GATEWAY,
                    "server-error",
                    "fetch-failed",
                    headlines,
                );
            }
        };

        let mut article = mapper.map(&post, 0);
        if let Some(id) = post.unembedded_media() {
            match self.client.media(id).await {
                Ok(media) => {
                    if let Some(url) = media.source_url.filter(|url| !url.trim().is_empty()) {
                        article.image = url;
                    }
                }
                Err(err) => warn!("Failed to fetch media {id} of `{slug}`: {err}"),
            }
        }
        let related = match related {
            Ok(posts) => {
                let posts = posts
                    .into_iter()
                    .filter(|related| related.id != post.id)
                    .collect::<Vec<_>>();
                mapper.map_all(&posts, 0)
            }
            Err(err) => {
                warn!("Failed to fetch the related posts of `{slug}`: {err}");
                Vec::new()
            }
        };
        let content = html::process_content(
            &article.content,
            self.wordpress_host.as_deref(),
            &self.config.theme.placeholder_image,
        )?;

        let site = &self.config.site;
        let url = absolute_url(&site.url, &article.path());
        let image = if article.image.starts_with('/') {
            absolute_url(&site.url, &article.image)
        } else {
            article.image.clone()
        };
        let meta = Meta::new(
            format!("{} | {}", article.title, site.name),
            article.description.as_str(),
        )
        .with_url(&site.url, &article.path())
        .with_image(image)
        .article();
        let body = self.engine.render(
            "article.html",
            context! {
                meta => meta,
                share => ShareLinks::new(url, &article.title),
                article => &article,
                content => content,
                selected_tag => tag,
                related => related,
                headlines => headlines,
            },
        )?;
        Ok(Reply::html(StatusCode::OK, body))
    }

    async fn magazine(&self) -> Result<Reply> {
        let magazine = &self.config.magazine;
        let query = PostQuery::new().latest().per_page(magazine.per_page);
        let (posts, headlines) = futures::join!(
            self.client.post_type(&magazine.post_type, &query),
            self.headlines()
        );

        let now = OffsetDateTime::now_utc();
        let (issues, failed) = match posts {
            Ok(paged) => (
                paged
                    .items
                    .iter()
                    .enumerate()
                    .map(|(index, post)| {
                        entity::Magazine::from_post(
                            post,
                            index,
                            &magazine.images,
                            &self.config.theme.placeholder_image,
                            now,
                        )
                    })
                    .collect::<Vec<_>>(),
                false,
            ),
            Err(err) => {
                warn!("Failed to fetch the magazine issues: {err}");
                (Vec::new(), true)
            }
        };

        let site = &self.config.site;
        let meta = Meta::new(
            format!("{} | {}", magazine.title, site.name),
            magazine.title.as_str(),
        )
        .with_url(&site.url, &format!("/{}", magazine.slug));
        let body = self.engine.render(
            "magazine.html",
            context! {
                meta => meta,
                issues => issues,
                error => failed,
                headlines => headlines,
            },
        )?;
        Ok(Reply::html(StatusCode::OK, body))
    }

    async fn page(&self, slug: &str) -> Result<Reply> {
        let Some(page) = self.pages.get(slug) else {
            return self.not_found().await;
        };
        let headlines = self.headlines().await;

        let site = &self.config.site;
        let meta = Meta::new(
            format!("{} | {}", page.title, site.name),
            page.description.as_str(),
        )
        .with_url(&site.url, &page.path());
        let body = self.engine.render(
            "page.html",
            context! {
                meta => meta,
                page => page,
                headlines => headlines,
            },
        )?;
        Ok(Reply::html(StatusCode::OK, body))
    }

    async fn feed(&self) -> Result<Reply> {
        let query = PostQuery::new().latest().per_page(FEED_SIZE);
        let (mapper, posts) = futures::join!(self.mapper(), self.client.posts(&query));
        let posts = match posts {
            Ok(paged) => paged.items,
            Err(err) => {
                warn!("Failed to fetch the feed posts: {err}");
                return Ok(Reply::text(
                    StatusCode::BAD_GATEWAY,
                    self.engine.fluent("fetch-failed"),
                ));
            }
        };

        let now = OffsetDateTime::now_utc();
        let articles = mapper.map_all(&posts, 0);
        let site_url = &self.config.site.url;
        let entries = articles
            .iter()
            .map(|article| FeedEntry::new(site_url, article, now))
            .collect::<Vec<_>>();
        let body = self.engine.render(
            "feed.xml",
            context! {
                entries => entries,
                updated => feed_updated(&articles, now),
            },
        )?;
        Ok(Reply {
            status: StatusCode::OK,
            content_type: ATOM,
            body,
        })
    }

    async fn sitemap(&self) -> Result<Reply> {
        let site_url = &self.config.site.url;
        let mut entries = vec![SitemapEntry::new(site_url, "/", None)];
        entries.extend(
            self.config
                .sections
                .iter()
                .map(|section| SitemapEntry::new(site_url, &section.path(), None)),
        );
        entries.push(SitemapEntry::new(
            site_url,
            &format!("/{}", self.config.magazine.slug),
            None,
        ));
        entries.extend(
            self.pages
                .values()
                .map(|page| SitemapEntry::new(site_url, &page.path(), None)),
        );

        let query = PostQuery::new()
            .latest()
            .per_page(SITEMAP_POSTS)
            .without_embed();
        match self.client.posts(&query).await {
            Ok(paged) => entries.extend(paged.items.iter().map(|post| {
                SitemapEntry::new(
                    site_url,
                    &format!("/{}", post.slug),
                    parse_wp_datetime(post.date_gmt.as_deref(), &post.date),
                )
            })),
            Err(err) => warn!("Failed to list posts for the sitemap: {err}"),
        }

        let body = self
            .engine
            .render("sitemap.xml", context! { entries => entries })?;
        Ok(Reply {
            status: StatusCode::OK,
            content_type: XML,
            body,
        })
    }

    async fn not_found(&self) -> Result<Reply> {
        let headlines = self.headlines().await;
        self.error_page(
            StatusCode::NOT_FOUND,
            "page-not-found",
            "page-not-found-message",
            headlines,
        )
    }

    fn error_page(
        &self,
        status: StatusCode,
        title_key: &str,
        message_key: &str,
        headlines: Arc<Vec<String>>,
    ) -> Result<Reply> {
        let title = self.engine.fluent(title_key);
        let message = self.engine.fluent(message_key);
        let meta = Meta::new(
            format!("{title} | {}", self.config.site.name),
            message.as_str(),
        );
        let body = self.engine.render(
            "error.html",
            context! {
                meta => meta,
                title => &title,
                message => &message,
                headlines => headlines,
            },
        )?;
        Ok(Reply::html(status, body))
    }

    fn server_error(&self) -> Reply {
        self.error_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "server-error",
            "fetch-failed",
            Arc::default(),
        )
        .unwrap_or_else(|err| {
            error!("Failed to render the error page: {err:?}");
            Reply::text(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
        })
    }
}
