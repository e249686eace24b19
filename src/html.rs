use std::cell::Cell;

use anyhow::Result;
use html5ever::{parse_document, tendril::TendrilSink, tree_builder::TreeBuilderOpts, ParseOpts};
use lol_html::{element, html_content::ContentType, HtmlRewriter, Settings};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use url::Url;

/// The class added to every image inside the article content.
pub const CONTENT_IMAGE_CLASS: &str = "article-content-image";

/// Post-process the rendered WordPress content of an article.
///
/// - links pointing to the WordPress site are rewritten to internal routes
/// - images get the content class, lazy loading and a placeholder fallback
/// - images not inside a `<figure>` are wrapped into an `image-wrapper` div
pub fn process_content(
    raw_html: &str,
    wordpress_host: Option<&str>,
    placeholder: &str,
) -> Result<String> {
    if raw_html.is_empty() {
        return Ok(String::new());
    }

    let onerror = format!("this.src='{placeholder}'; this.onerror=null;");
    // Set by the `figure img` handler, which runs before the `img` handler.
    let in_figure = Cell::new(false);

    let mut html = vec![];
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("a[href]", |el| {
                    if let (Some(href), Some(host)) = (el.get_attribute("href"), wordpress_host) {
                        if let Some(route) = internal_route(&href, host) {
                            el.set_attribute("href", &route)?;
                        }
                    }
                    Ok(())
                }),
                element!("figure img", |_el| {
                    in_figure.set(true);
                    Ok(())
                }),
                element!("img", |el| {
                    match el.get_attribute("class") {
                        Some(class) if class.trim().is_empty() => {
                            el.set_attribute("class", CONTENT_IMAGE_CLASS)?
                        }
                        Some(class) => {
                            if !class.split_whitespace().any(|c| c == CONTENT_IMAGE_CLASS) {
                                el.set_attribute(
                                    "class",
                                    &format!("{} {CONTENT_IMAGE_CLASS}", class.trim()),
                                )?;
                            }
                        }
                        None => el.set_attribute("class", CONTENT_IMAGE_CLASS)?,
                    }
                    if !el.has_attribute("loading") {
                        el.set_attribute("loading", "lazy")?;
                    }
                    if !el.has_attribute("onerror") {
                        el.set_attribute("onerror", &onerror)?;
                    }

                    if !in_figure.replace(false) {
                        el.before(r#"<div class="image-wrapper">"#, ContentType::Html);
                        el.after("</div>", ContentType::Html);
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |c: &[u8]| {
            html.extend_from_slice(c);
        },
    );
    rewriter.write(raw_html.as_bytes())?;
    rewriter.end()?;

    Ok(String::from_utf8_lossy(&html).into_owned())
}

/// Map a WordPress link to the internal route of the same article: `/{slug}`.
///
/// Return `None` if the link isn't an absolute link to `host`, or no slug
/// can be extracted from it. WordPress system paths (`/wp-content/...`) are
/// never rewritten.
pub fn internal_route(href: &str, host: &str) -> Option<String> {
    let url = Url::parse(href.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if !url.host_str()?.eq_ignore_ascii_case(host) {
        return None;
    }

    let segments = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    match segments.first() {
        Some(first) if first.starts_with("wp-") => None,
        _ => segments.last().map(|slug| format!("/{slug}")),
    }
}

/// Convert an HTML snippet into plain text.
///
/// Tags are stripped, entities decoded and whitespace collapsed.
pub fn to_plain_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let parse_opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let rc_dom = parse_document(RcDom::default(), parse_opts).one(html);

    let mut buffer = String::new();
    walk(&rc_dom.document, &mut buffer);
    buffer.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Walk html tree to collect the text nodes.
fn walk(handle: &Handle, buffer: &mut String) {
    match handle.data {
        NodeData::Text { ref contents } => {
            buffer.push_str(&contents.borrow());
        }
        NodeData::Element { ref name, .. } => {
            match name.local.as_ref() {
                "script" | "style" | "template" => return,
                "br" | "p" | "div" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    buffer.push(' ')
                }
                _ => {}
            }
        }
        _ => {}
    }

    for child in handle.children.borrow().iter() {
        walk(child, buffer);
    }
}

/// Extract the description from HTML content.
///
/// Only take at most `limit` plain chars.
pub fn extract_description(html: &str, limit: usize) -> String {
    to_plain_text(html).chars().take(limit).collect()
}
