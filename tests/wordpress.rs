use std::{collections::HashMap, convert::Infallible, net::SocketAddr, time::Duration};

use hyper::{
    header::CONTENT_TYPE,
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use streetpress::{
    config::WordPress,
    error::WpError,
    wordpress::{PostQuery, WpClient},
    Config, Site,
};

const PER_PAGE: u32 = 3;
const TOTAL: u64 = 7;

fn post(id: u64, slug: &str, title: &str) -> String {
    format!(
        r#"{{
            "id": {id},
            "slug": "{slug}",
            "date": "2025-09-12T11:40:00",
            "date_gmt": "2025-09-12T10:40:00",
            "title": {{ "rendered": "{title}" }},
            "content": {{ "rendered": "<p><a href=\"http://127.0.0.1/rema-debut-album/\">Rema</a></p><img src=\"/a.jpg\">" }},
            "excerpt": {{ "rendered": "<p>{title}</p>" }},
            "author": 7,
            "categories": [12],
            "tags": [301],
            "_embedded": {{
                "wp:term": [
                    [{{ "id": 12, "name": "Music", "slug": "music", "taxonomy": "category" }}],
                    [{{ "id": 301, "name": "Victony", "slug": "victony", "taxonomy": "post_tag" }}]
                ]
            }}
        }}"#
    )
}

fn json(status: StatusCode, body: String) -> Response<Body> {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, "application/json".parse().unwrap());
    resp
}

fn posts(params: &HashMap<String, String>) -> Response<Body> {
    if let Some(slug) = params.get("slug") {
        return match slug.as_str() {
            "victony-releases-stubborn" => json(
                StatusCode::OK,
                format!("[{}]", post(1, slug, "Victony Releases Stubborn")),
            ),
            // The featured media isn't embedded, only its id is known.
            "wizkid-nativeland" => json(
                StatusCode::OK,
                format!(
                    "[{}]",
                    post(2, slug, "Wizkid Makes Surprise Nativeland Appearance")
                        .replace(r#""author": 7,"#, r#""author": 7, "featured_media": 5,"#)
                ),
            ),
            _ => json(StatusCode::OK, "[]".into()),
        };
    }
    if let Some(search) = params.get("search") {
        return match search.as_str() {
            "victony stubborn" => json(
                StatusCode::OK,
                format!(
                    "[{}]",
                    post(1, "victony-releases-stubborn", "Victony Releases Stubborn")
                ),
            ),
            _ => json(StatusCode::OK, "[]".into()),
        };
    }

    let page = params
        .get("page")
        .and_then(|page| page.parse::<u64>().ok())
        .unwrap_or(1);
    let total_pages = (TOTAL + PER_PAGE as u64 - 1) / PER_PAGE as u64;
    if page > total_pages {
        return json(
            StatusCode::BAD_REQUEST,
            r#"{"code":"rest_post_invalid_page_number"}"#.into(),
        );
    }
    let first = (page - 1) * PER_PAGE as u64 + 1;
    let last = (page * PER_PAGE as u64).min(TOTAL);
    let items = (first..=last)
        .map(|id| post(id, &format!("post-{id}"), &format!("Post {id}")))
        .collect::<Vec<_>>()
        .join(",");
    let mut resp = json(StatusCode::OK, format!("[{items}]"));
    let headers = resp.headers_mut();
    headers.insert("X-WP-Total", TOTAL.to_string().parse().unwrap());
    headers.insert("X-WP-TotalPages", total_pages.to_string().parse().unwrap());
    resp
}

fn categories(params: &HashMap<String, String>) -> Response<Body> {
    let music = r#"{"id":12,"name":"Music","slug":"music","count":40}"#;
    match params.get("slug").map(String::as_str) {
        Some("music") => json(StatusCode::OK, format!("[{music}]")),
        Some(_) => json(StatusCode::OK, "[]".into()),
        None => json(
            StatusCode::OK,
            format!(r#"[{music},{{"id":40,"name":"Fashion &amp; Style","slug":"fashion"}}]"#),
        ),
    }
}

async fn wordpress(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let params = url::form_urlencoded::parse(req.uri().query().unwrap_or_default().as_bytes())
        .into_owned()
        .collect::<HashMap<_, _>>();
    let resp = match req.uri().path() {
        "/wp-json/wp/v2/posts" => posts(&params),
        "/wp-json/wp/v2/categories" => categories(&params),
        "/wp-json/wp/v2/media/5" => json(
            StatusCode::OK,
            r#"{"id":5,"source_url":"https://cdn.example.com/wizkid.jpg","alt_text":"Wizkid"}"#
                .into(),
        ),
        "/wp-json/the49th/v1/contributors" => json(
            StatusCode::OK,
            r#"[{"id":7,"name":"Iam Noone"},{"id":"8","name":"Ada Obi"}]"#.into(),
        ),
        "/wp-json/wp/v2/magazine" => json(StatusCode::OK, "<html>oops</html>".into()),
        // Headers go out at once, the body never finishes.
        "/wp-json/wp/v2/media/9" => {
            let (sender, body) = Body::channel();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(sender);
            });
            Response::new(body)
        }
        _ => json(StatusCode::NOT_FOUND, r#"{"code":"rest_no_route"}"#.into()),
    };
    Ok(resp)
}

// Spawn a mock WordPress on a random port.
fn spawn_wordpress() -> SocketAddr {
    let make_service = make_service_fn(|_| async { Ok::<_, Infallible>(service_fn(wordpress)) });
    let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_service);
    let addr = server.local_addr();
    tokio::spawn(server);
    addr
}

fn client(addr: SocketAddr) -> WpClient {
    WpClient::new(&WordPress {
        api_url: format!("http://{addr}/wp-json"),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_stalled_body_times_out() {
    let client = WpClient::new(&WordPress {
        api_url: format!("http://{}/wp-json", spawn_wordpress()),
        timeout_secs: 1,
        ..Default::default()
    });
    let err = client.media(9).await.unwrap_err();
    assert!(matches!(err, WpError::Timeout(_)));
}

#[tokio::test]
async fn test_posts_pagination() {
    let client = client(spawn_wordpress());

    let first = client
        .posts(&PostQuery::new().per_page(PER_PAGE))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 3);
    assert_eq!(first.total, Some(TOTAL));
    assert_eq!(first.total_pages, Some(3));
    assert!(first.has_more());

    let last = client
        .posts(&PostQuery::new().per_page(PER_PAGE).page(3))
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].id, 7);
    assert!(!last.has_more());
}

#[tokio::test]
async fn test_out_of_range_page_is_empty() {
    let client = client(spawn_wordpress());
    let beyond = client
        .posts(&PostQuery::new().per_page(PER_PAGE).page(4))
        .await
        .unwrap();
    assert!(beyond.items.is_empty());
    assert!(!beyond.has_more());
}

#[tokio::test]
async fn test_post_by_slug() {
    let client = client(spawn_wordpress());

    let post = client
        .post_by_slug("victony-releases-stubborn")
        .await
        .unwrap();
    assert_eq!(post.id, 1);
    assert_eq!(post.category_terms()[0].name, "Music");

    // Missing slug, found by searching its words.
    let post = client.post_by_slug("victony-stubborn").await.unwrap();
    assert_eq!(post.slug, "victony-releases-stubborn");

    let err = client.post_by_slug("no-such-article").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_contributors_and_categories() {
    let client = client(spawn_wordpress());

    let contributors = client.contributors().await.unwrap();
    assert_eq!(contributors.len(), 2);
    // String ids are accepted as well.
    assert_eq!(contributors[1].id, 8);

    let categories = client.categories().await.unwrap();
    assert_eq!(categories.len(), 2);
    let music = client.category_by_slug("music").await.unwrap().unwrap();
    assert_eq!(music.id, 12);
    assert!(client.category_by_slug("sports").await.unwrap().is_none());

    let media = client.media(5).await.unwrap();
    assert_eq!(
        media.source_url.as_deref(),
        Some("https://cdn.example.com/wizkid.jpg")
    );
}

#[tokio::test]
async fn test_errors() {
    let client = client(spawn_wordpress());

    let err = client.media(404).await.unwrap_err();
    assert!(err.is_not_found());

    let err = client
        .post_type("magazine", &PostQuery::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Unexpected JSON"));
}

fn site(addr: SocketAddr) -> Site {
    let config = Config::parse_str(&format!(
        r#"
        [site]
        url = "https://the49thstreet.com"
        name = "49th Street"

        [wordpress]
        api_url = "http://{addr}/wp-json"

        [home]
        hero_count = 2
        sidebar_exclude = 1
        sidebar_count = 2

        [[home.block]]
        section = "music"

        [[section]]
        slug = "music"
        title = "Music Updates"
        category = "music"
        per_page = 3
        "#
    ))
    .unwrap();
    let source = std::env::temp_dir().join("streetpress-test-mock-site");
    Site::new(&source, config).unwrap()
}

#[tokio::test]
async fn test_render_article() {
    let site = site(spawn_wordpress());
    let reply = site.handle("/victony-releases-stubborn", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply
        .body
        .contains("<title>Victony Releases Stubborn | 49th Street</title>"));
    // Links to the WordPress host point to the internal route.
    assert!(reply.body.contains(r#"<a href="/rema-debut-album">Rema</a>"#));
    assert!(reply.body.contains(r#"loading="lazy""#));
    assert!(reply.body.contains("IAM NOONE"));
    assert!(reply.body.contains("#Victony"));
}

#[tokio::test]
async fn test_render_article_not_found() {
    let site = site(spawn_wordpress());
    let reply = site.handle("/article/no-such-article", None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.body.contains("Article Not Found"));
}

#[tokio::test]
async fn test_render_section() {
    let site = site(spawn_wordpress());
    let reply = site.handle("/music", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Music Updates"));
    assert!(reply.body.contains("Post 3"));
    assert!(reply.body.contains("load-more"));

    let reply = site.handle("/music", Some("page=3&partial=1")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Post 7"));
    assert!(!reply.body.contains("<html"));
    assert!(!reply.body.contains("load-more"));
}

#[tokio::test]
async fn test_render_article_media_fallback() {
    let site = site(spawn_wordpress());
    let reply = site.handle("/wizkid-nativeland", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("cdn.example.com"));
    assert!(reply.body.contains("wizkid.jpg"));
}

#[tokio::test]
async fn test_render_home() {
    let site = site(spawn_wordpress());
    let reply = site.handle("/", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    // Hero slides are the first two posts.
    assert!(reply
        .body
        .contains(r#"<a class="hero-slide active" href="/post-1">"#));
    assert!(reply.body.contains(r#"<a class="hero-slide" href="/post-2">"#));
    assert!(!reply.body.contains(r#"<a class="hero-slide" href="/post-3">"#));
    // The sidebar skips the first post.
    assert!(!reply.body.contains(r#"<a class="row" href="/post-1">"#));
    assert!(reply.body.contains(r#"<a class="row" href="/post-2">"#));
    assert!(reply.body.contains(r#"<a class="row" href="/post-3">"#));
    assert!(reply.body.contains("LATEST"));
    // The music block.
    assert!(reply.body.contains("Music Updates</a>"));
}

#[tokio::test]
async fn test_render_related_articles() {
    let site = site(spawn_wordpress());
    let reply = site
        .handle("/victony-releases-stubborn", Some("tag=301"))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Related Articles"));
    assert!(reply.body.contains(r#"<a class="tag active""#));
    // The article itself isn't related to itself.
    assert!(!reply.body.contains(r#"<a href="/post-1">"#));
    assert!(reply.body.contains(r#"<a href="/post-2">"#));
    assert!(reply.body.contains(r#"<a href="/post-3">"#));
}

#[tokio::test]
async fn test_render_magazine_failed() {
    let site = site(spawn_wordpress());
    let reply = site.handle("/orange-mag", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Orange Mag"));
    assert!(reply
        .body
        .contains("Failed to load articles. Please try again."));
    assert!(reply.body.contains("Try Again"));
    assert!(!reply.body.contains("No magazine issues yet."));
}

#[tokio::test]
async fn test_render_search() {
    let site = site(spawn_wordpress());
    let reply = site
        .handle("/search", Some("q=victony+stubborn"))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("One result"));
    assert!(reply.body.contains("Victony Releases Stubborn"));
    assert!(!reply.body.contains("load-more"));
}

#[tokio::test]
async fn test_render_feed() {
    let site = site(spawn_wordpress());
    let reply = site.handle("/feed.xml", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.content_type.starts_with("application/atom+xml"));
    assert_eq!(reply.body.matches("<entry>").count(), 3);
    assert!(reply.body.contains("<title>Post 1</title>"));
    assert!(reply.body.contains("post-3</id>"));
    assert!(reply.body.contains("<category term=\"MUSIC\"/>"));
}

#[tokio::test]
async fn test_render_sitemap() {
    let site = site(spawn_wordpress());
    let reply = site.handle("/sitemap.xml", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.content_type.starts_with("application/xml"));
    // Home, the music section, the magazine and 3 posts.
    assert_eq!(reply.body.matches("<loc>").count(), 6);
    assert!(reply.body.contains("music</loc>"));
    assert!(reply.body.contains("orange-mag</loc>"));
    assert!(reply.body.contains("post-1</loc>"));
    assert!(reply.body.contains("<lastmod>2025-09-12</lastmod>"));
}
