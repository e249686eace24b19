use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context as _, Result};
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::{
    helpers::capitalize,
    markdown::{extract_description, extract_title, render_html},
};

use super::DESCRIPTION_LENGTH;

/// A local page rendered from `pages/{slug}.md`, such as `about-us`.
#[derive(Clone, Debug, Serialize)]
pub struct Page {
    pub slug: String,
    pub title: String,
    pub description: String,
    /// The rendered HTML.
    pub html: String,
}

impl Page {
    /// The slug is the file stem, `about-us.md` serves `/about-us`.
    pub fn new(file_name: impl AsRef<Path>, markdown: &str) -> Self {
        let slug = file_name
            .as_ref()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = extract_title(markdown).unwrap_or_else(|| {
            slug.split('-')
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" ")
        });
        Page {
            description: extract_description(markdown, DESCRIPTION_LENGTH),
            html: render_html(markdown),
            title,
            slug,
        }
    }

    pub fn path(&self) -> String {
        format!("/{}", self.slug)
    }
}

/// Load the markdown pages directly under the `pages` directory.
///
/// Routes have a single segment, so nested files are skipped.
pub fn load_pages(dir: &Path) -> Result<BTreeMap<String, Page>> {
    let mut pages = BTreeMap::new();
    if !dir.exists() {
        return Ok(pages);
    }

    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "md") {
            continue;
        }

        let markdown = fs::read_to_string(path)
            .with_context(|| format!("Failed to read page `{}`", path.display()))?;
        let page = Page::new(path, &markdown);
        debug!("Loaded page `{}`", page.slug);
        pages.insert(page.slug.clone(), page);
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::Page;

    #[test_case("  # Title\naaa"; "case0")]
    #[test_case("# Title\naaa"; "case1")]
    #[test_case("## Title\naaa"; "case2")]
    #[test_case("\n\n# Title\naaa"; "case3")]
    #[test_case("\n# Title\n## Subtitle\naaa"; "case4")]
    #[test_case("Title\n=====\naaa"; "setext")]
    fn test_parse_page_title(markdown: &str) {
        let page = Page::new("about-us.md", markdown);
        assert_eq!("Title", page.title);
    }

    #[test]
    fn test_page_without_heading() {
        let page = Page::new("about-us.md", "49th Street is a culture publication.");
        assert_eq!(page.slug, "about-us");
        assert_eq!(page.path(), "/about-us");
        assert_eq!(page.title, "About Us");
        assert_eq!(page.description, "49th Street is a culture publication.");
    }

    #[test]
    fn test_load_pages() {
        let dir = std::env::temp_dir().join("streetpress-test-pages");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("shop.md"), "# Shop\n\nComing soon.").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir_all(dir.join("drafts")).unwrap();
        std::fs::write(dir.join("drafts").join("trivia.md"), "# Trivia").unwrap();

        let pages = super::load_pages(&dir).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages["shop"].title, "Shop");
        assert!(!pages.contains_key("drafts/trivia"));
        assert!(!pages.contains_key("trivia"));
        assert!(super::load_pages(&dir.join("missing")).unwrap().is_empty());
    }
}
