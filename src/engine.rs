use std::sync::Arc;

use anyhow::Result;
use minijinja::{value::Value, Environment};
use serde::Serialize;

use crate::{config::Config, locales::FluentLoader};

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("_header.html", include_str!("../templates/_header.html")),
    ("_footer.html", include_str!("../templates/_footer.html")),
    ("_macros.html", include_str!("../templates/_macros.html")),
    ("_cards.html", include_str!("../templates/_cards.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("listing.html", include_str!("../templates/listing.html")),
    ("article.html", include_str!("../templates/article.html")),
    ("magazine.html", include_str!("../templates/magazine.html")),
    ("page.html", include_str!("../templates/page.html")),
    ("error.html", include_str!("../templates/error.html")),
    ("feed.xml", include_str!("../templates/feed.xml")),
    ("sitemap.xml", include_str!("../templates/sitemap.xml")),
];

/// The minimal nav entry of a section.
#[derive(Serialize)]
struct NavSection<'a> {
    slug: &'a str,
    title: &'a str,
}

/// The template engine with every builtin template registered.
///
/// Templates ending with `.html` or `.xml` are auto escaped.
pub struct Engine {
    env: Environment<'static>,
    fluent: Arc<FluentLoader>,
}

impl Engine {
    pub fn new(config: &Config) -> Result<Self> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }

        env.add_global("site", Value::from_serializable(&config.site));
        env.add_global("theme", Value::from_serializable(&config.theme));
        env.add_global("magazine", Value::from_serializable(&config.magazine));
        env.add_global(
            "sections",
            Value::from_serializable(
                &config
                    .sections
                    .iter()
                    .map(|section| NavSection {
                        slug: &section.slug,
                        title: &section.title,
                    })
                    .collect::<Vec<_>>(),
            ),
        );
        env.add_global("version", env!("CARGO_PKG_VERSION"));

        let fluent = Arc::new(FluentLoader::new(&config.site.locale));
        let fluent_loader = Arc::clone(&fluent);
        env.add_function("fluent", move |key: &str, number: Option<i64>| -> String {
            fluent_loader.format(key, number)
        });
        Ok(Engine { env, fluent })
    }

    /// Localize the builtin text of `key`.
    pub fn fluent(&self, key: &str) -> String {
        self.fluent.format(key, None)
    }

    pub fn render(&self, template: &str, context: impl Serialize) -> Result<String> {
        Ok(self.env.get_template(template)?.render(context)?)
    }
}

#[cfg(test)]
mod tests {
    use minijinja::context;

    use super::*;
    use crate::{
        entity::{Article, Listing},
        meta::Meta,
    };

    const CONFIG: &str = r#"
        [site]
        url = "https://the49thstreet.com"
        name = "49th Street"

        [[section]]
        slug = "music"
        title = "Music Updates"
    "#;

    fn engine() -> Engine {
        Engine::new(&Config::parse_str(CONFIG).unwrap()).unwrap()
    }

    fn article(id: u64, title: &str) -> Article {
        Article {
            id,
            slug: format!("post-{id}"),
            title: title.into(),
            image: "/static/images/placeholder.svg".into(),
            author: "Iam Noone".into(),
            category: "MUSIC".into(),
            time: "5 MINS AGO".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_listing() {
        let listing = Listing {
            articles: vec![article(1, "Tems & Wizkid"), article(2, "Rema")],
            page: 1,
            has_more: true,
            next_page: Some(2),
            ..Default::default()
        };
        let html = engine()
            .render(
                "listing.html",
                context! {
                    meta => Meta::new("Music Updates | 49th Street", "Music"),
                    title => "Music Updates",
                    label => "Latest",
                    listing => listing,
                    next_url => "/music?page=2",
                    headlines => vec!["MUSIC: Rema"],
                },
            )
            .unwrap();

        assert!(html.contains("<title>Music Updates | 49th Street</title>"));
        // Titles are escaped.
        assert!(html.contains("Tems &amp; Wizkid"));
        assert!(html.contains(r#"href="/post-2""#));
        assert!(html.contains("IAM NOONE"));
        assert!(html.contains("music?page=2"));
        assert!(html.contains("Load More"));
        assert!(html.contains("MUSIC: Rema"));
        // The nav lists the sections.
        assert!(html.contains(r#"<a href="/music">Music Updates</a>"#));
    }

    #[test]
    fn test_render_listing_error() {
        let html = engine()
            .render(
                "listing.html",
                context! {
                    meta => Meta::new("Music Updates", "Music"),
                    title => "Music Updates",
                    label => "Latest",
                    listing => Listing::default(),
                    error => "Failed to load articles. Please try again.",
                    retry_url => "/music?page=2",
                },
            )
            .unwrap();
        assert!(html.contains("Failed to load articles. Please try again."));
        assert!(html.contains(r#"music?page=2">Try Again</a>"#));
        assert!(!html.contains("load-more"));
    }

    #[test]
    fn test_render_article() {
        let mut article = article(7, "Victony");
        article.date = "September 12, 2025".into();
        let html = engine()
            .render(
                "article.html",
                context! {
                    meta => Meta::new("Victony", "Stubborn").article(),
                    article => article,
                    content => r#"<p><a href="/rema">Rema</a></p>"#,
                    share => context! {
                        url => "https://the49thstreet.com/post-7",
                        twitter => "https://twitter.com/intent/tweet",
                        facebook => "https://www.facebook.com/sharer/sharer.php",
                        whatsapp => "https://wa.me/",
                    },
                    related => Vec::<Article>::new(),
                },
            )
            .unwrap();
        // Content isn't escaped.
        assert!(html.contains(r#"<p><a href="/rema">Rema</a></p>"#));
        assert!(html.contains("September 12, 2025"));
        assert!(html.contains(r#"<meta property="og:type" content="article">"#));
        assert!(!html.contains("Related Articles"));
    }

    #[test]
    fn test_render_partial_cards() {
        let listing = Listing {
            articles: vec![article(3, "Minz")],
            page: 2,
            ..Default::default()
        };
        let html = engine()
            .render("_cards.html", context! { listing => listing })
            .unwrap();
        assert!(html.contains(r#"data-page="2""#));
        assert!(!html.contains("<html"));
        assert!(!html.contains("load-more"));
    }
}
