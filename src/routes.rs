use url::form_urlencoded;

use crate::config::Config;

/// The pages served by the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Health,
    Feed,
    Sitemap,
    Search {
        query: String,
        page: u32,
        partial: bool,
    },
    Section {
        slug: String,
        page: u32,
        partial: bool,
    },
    Magazine,
    /// A local markdown page.
    Page(String),
    Article {
        slug: String,
        tag: Option<u64>,
    },
    NotFound,
}

#[derive(Debug, Default)]
struct Params {
    page: u32,
    partial: bool,
    query: String,
    tag: Option<u64>,
}

impl Params {
    fn parse(query: Option<&str>) -> Self {
        let mut params = Params {
            page: 1,
            ..Default::default()
        };
        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "page" => params.page = value.trim().parse().unwrap_or(1).max(1),
                "partial" => params.partial = matches!(value.as_ref(), "1" | "true"),
                "q" => params.query = value.trim().to_owned(),
                "tag" => params.tag = value.trim().parse().ok(),
                _ => {}
            }
        }
        params
    }
}

impl Route {
    /// Resolve the route of a request path.
    ///
    /// A single segment path is matched against the builtin routes, the magazine,
    /// the sections and the local pages, in that order. Anything else is
    /// treated as an article slug.
    pub fn resolve(
        config: &Config,
        is_page: impl Fn(&str) -> bool,
        path: &str,
        query: Option<&str>,
    ) -> Route {
        let params = Params::parse(query);
        let segments = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>();

        match segments.as_slice() {
            [] => Route::Home,
            ["healthz"] => Route::Health,
            ["feed.xml"] => Route::Feed,
            ["sitemap.xml"] => Route::Sitemap,
            ["search"] => Route::Search {
                query: params.query,
                page: params.page,
                partial: params.partial,
            },
            ["article", slug] => Route::Article {
                slug: slug.to_string(),
                tag: params.tag,
            },
            [slug] if slug.eq_ignore_ascii_case(&config.magazine.slug) => Route::Magazine,
            [slug] => {
                if let Some(section) = config.section(slug) {
                    Route::Section {
                        slug: section.slug.clone(),
                        page: params.page,
                        partial: params.partial,
                    }
                } else if is_page(slug) {
                    Route::Page(slug.to_string())
                } else if is_slug(slug) {
                    Route::Article {
                        slug: slug.to_string(),
                        tag: params.tag,
                    }
                } else {
                    Route::NotFound
                }
            }
            _ => Route::NotFound,
        }
    }
}

// WordPress slugs are lowercase words joined by `-`, non-ascii chars are
// percent encoded. Paths like `favicon.ico` never match.
fn is_slug(segment: &str) -> bool {
    segment
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '%'))
}

/// Build the url of a listing page, such as `/search?q=tems&page=2`.
pub fn page_url(path: &str, params: &[(&str, &str)], page: u32) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(params);
    if page > 1 {
        serializer.append_pair("page", &page.to_string());
    }
    let query = serializer.finish();
    if query.is_empty() {
        path.to_owned()
    } else {
        format!("{path}?{query}")
    }
}
