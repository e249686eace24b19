use std::{collections::HashSet, fs, path::Path};

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// The root config of a streetpress site.
///
/// It parsed from the root directory's `streetpress.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: Site,
    #[serde(default)]
    pub wordpress: WordPress,
    #[serde(default)]
    pub theme: Theme,
    #[serde(rename = "section")]
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub home: Home,
    #[serde(default)]
    pub headline: Headline,
    #[serde(default)]
    pub magazine: Magazine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// The absolute url of this site.
    pub url: String,
    pub name: String,
    pub logo: Option<String>,
    pub description: Option<String>,
    /// The OpenGraph social image.
    pub social_image: Option<String>,
    /// The locale to localize some builtin text.
    /// Default to 'en'.
    #[serde(default = "Site::default_locale")]
    pub locale: String,
    #[serde(rename(deserialize = "menu"))]
    #[serde(default)]
    pub menus: Vec<Menu>,
    #[serde(rename(deserialize = "social"))]
    #[serde(default)]
    pub socials: Vec<Menu>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub name: String,
    pub url: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordPress {
    /// Base of the REST API, the `/wp-json` root.
    #[serde(default = "WordPress::default_api_url")]
    pub api_url: String,
    /// The public WordPress site url. Links pointing to this host inside
    /// article content are rewritten to internal routes.
    /// Fallback to the host of `api_url` if missing.
    pub site_url: Option<String>,
    #[serde(default = "WordPress::default_contributors_path")]
    pub contributors_path: String,
    #[serde(default = "WordPress::default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "WordPress::default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "Theme::default_placeholder")]
    pub placeholder_image: String,
    #[serde(default = "Theme::default_author")]
    pub default_author: String,
    #[serde(default = "Theme::default_category")]
    pub default_category: String,
    #[serde(default = "Theme::default_primary_color")]
    pub primary_color: String,
}

/// A category listing page, such as `/music` or `/news`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// The route of this section, `/{slug}`.
    pub slug: String,
    pub title: String,
    /// The small label above the title, rendered as `/// {label}`.
    #[serde(default = "Section::default_label")]
    pub label: String,
    /// The WordPress category slug. `None` lists the latest posts of all categories.
    pub category: Option<String>,
    /// A fixed WordPress category id, takes precedence over `category`.
    pub category_id: Option<u64>,
    /// Keywords to search the category list with if the slug lookup fails.
    #[serde(default)]
    pub match_keywords: Vec<String>,
    #[serde(default = "Section::default_per_page")]
    pub per_page: u32,
    /// List the latest posts if the category is missing or empty.
    #[serde(default)]
    pub fallback_to_latest: bool,
    pub default_author: Option<String>,
    pub default_category: Option<String>,
    /// Images used in turn for posts without featured media.
    #[serde(default)]
    pub fallback_images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Home {
    #[serde(default = "Home::default_hero_count")]
    pub hero_count: usize,
    /// How many hero posts are kept out of the sidebar.
    #[serde(default = "Home::default_sidebar_exclude")]
    pub sidebar_exclude: usize,
    #[serde(default = "Home::default_sidebar_count")]
    pub sidebar_count: usize,
    #[serde(default = "Home::default_latest_title")]
    pub latest_title: String,
    #[serde(default = "Home::default_latest_count")]
    pub latest_count: usize,
    #[serde(rename(deserialize = "block"))]
    #[serde(default)]
    pub blocks: Vec<HomeBlock>,
}

/// A home page block showing the first posts of a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeBlock {
    /// The slug of a declared `[[section]]`.
    pub section: String,
    pub title: Option<String>,
    #[serde(default = "HomeBlock::default_count")]
    pub count: usize,
    #[serde(default)]
    pub style: BlockStyle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStyle {
    #[default]
    Grid,
    Carousel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Headline {
    #[serde(default = "Headline::default_count")]
    pub count: u32,
    /// Shown when the latest posts can't be fetched.
    #[serde(default)]
    pub fallback: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Magazine {
    #[serde(default = "Magazine::default_slug")]
    pub slug: String,
    #[serde(default = "Magazine::default_title")]
    pub title: String,
    /// The WordPress custom post type.
    #[serde(default = "Magazine::default_post_type")]
    pub post_type: String,
    #[serde(default = "Magazine::default_per_page")]
    pub per_page: u32,
    #[serde(default = "Magazine::default_images")]
    pub images: Vec<String>,
}

impl Config {
    pub fn parse_from_toml<P: AsRef<Path>>(source: P) -> Result<Self> {
        let path = source.as_ref().join(crate::ROOT_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read `{}`", path.display()))?;
        Ok(Self::parse_str(&content)?)
    }

    pub fn parse_str(content: &str) -> std::result::Result<Self, ConfigError> {
        let config = toml::from_str::<Config>(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        Url::parse(&self.wordpress.api_url)
            .map_err(|err| ConfigError::InvalidUrl(self.wordpress.api_url.clone(), err))?;
        if let Some(site_url) = self.wordpress.site_url.as_ref() {
            Url::parse(site_url).map_err(|err| ConfigError::InvalidUrl(site_url.clone(), err))?;
        }

        let mut slugs = HashSet::new();
        for section in &self.sections {
            if !slugs.insert(section.slug.as_str()) {
                return Err(ConfigError::DuplicatedSection(section.slug.clone()));
            }
        }
        if let Some(block) = self
            .home
            .blocks
            .iter()
            .find(|block| self.section(&block.section).is_none())
        {
            return Err(ConfigError::UnknownSection(block.section.clone()));
        }
        Ok(())
    }

    pub fn section(&self, slug: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.slug.eq_ignore_ascii_case(slug))
    }

    /// The host whose links are treated as internal article links.
    pub fn wordpress_host(&self) -> Option<String> {
        let url = self
            .wordpress
            .site_url
            .as_deref()
            .unwrap_or(&self.wordpress.api_url);
        Url::parse(url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned))
    }
}

impl Site {
    fn default_locale() -> String {
        "en".into()
    }
}

impl Default for WordPress {
    fn default() -> Self {
        Self {
            api_url: Self::default_api_url(),
            site_url: None,
            contributors_path: Self::default_contributors_path(),
            cache_ttl_secs: Self::default_cache_ttl(),
            timeout_secs: Self::default_timeout(),
        }
    }
}

impl WordPress {
    const DEFAULT_API_URL: &'static str = "https://staging.the49thstreet.com/wp-json";

    fn default_api_url() -> String {
        Self::DEFAULT_API_URL.into()
    }

    fn default_contributors_path() -> String {
        "/the49th/v1/contributors".into()
    }

    fn default_cache_ttl() -> u64 {
        300
    }

    fn default_timeout() -> u64 {
        15
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            placeholder_image: Self::default_placeholder(),
            default_author: Self::default_author(),
            default_category: Self::default_category(),
            primary_color: Self::default_primary_color(),
        }
    }
}

impl Theme {
    fn default_placeholder() -> String {
        "/static/images/placeholder.svg".into()
    }

    fn default_author() -> String {
        "49TH STREET".into()
    }

    fn default_category() -> String {
        "NEWS".into()
    }

    fn default_primary_color() -> String {
        "#F26509".into()
    }
}

impl Section {
    fn default_label() -> String {
        "Latest".into()
    }

    fn default_per_page() -> u32 {
        9
    }

    pub fn path(&self) -> String {
        format!("/{}", self.slug)
    }
}

impl Default for Home {
    fn default() -> Self {
        Self {
            hero_count: Self::default_hero_count(),
            sidebar_exclude: Self::default_sidebar_exclude(),
            sidebar_count: Self::default_sidebar_count(),
            latest_title: Self::default_latest_title(),
            latest_count: Self::default_latest_count(),
            blocks: Vec::new(),
        }
    }
}

impl Home {
    fn default_hero_count() -> usize {
        10
    }

    fn default_sidebar_exclude() -> usize {
        5
    }

    fn default_sidebar_count() -> usize {
        6
    }

    fn default_latest_title() -> String {
        "LATEST".into()
    }

    fn default_latest_count() -> usize {
        3
    }

    /// How many posts the home page needs from the latest feed.
    pub fn latest_fetch_count(&self) -> usize {
        self.hero_count
            .max(self.sidebar_exclude + self.sidebar_count)
            .max(self.latest_count)
    }
}

impl HomeBlock {
    fn default_count() -> usize {
        3
    }
}

impl Default for Headline {
    fn default() -> Self {
        Self {
            count: Self::default_count(),
            fallback: Vec::new(),
        }
    }
}

impl Headline {
    fn default_count() -> u32 {
        5
    }
}

impl Default for Magazine {
    fn default() -> Self {
        Self {
            slug: Self::default_slug(),
            title: Self::default_title(),
            post_type: Self::default_post_type(),
            per_page: Self::default_per_page(),
            images: Self::default_images(),
        }
    }
}

impl Magazine {
    fn default_slug() -> String {
        "orange-mag".into()
    }

    fn default_title() -> String {
        "Orange Mag".into()
    }

    fn default_post_type() -> String {
        "magazine".into()
    }

    fn default_per_page() -> u32 {
        6
    }

    fn default_images() -> Vec<String> {
        vec!["/static/images/magazine.svg".into()]
    }
}
