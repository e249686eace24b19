use pulldown_cmark::{html, Event, Options, Parser, Tag};

use crate::html::to_plain_text;

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

/// Render markdown into HTML.
pub fn render_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut buffer = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut buffer, parser);
    buffer
}

/// The text of the first heading, if any.
pub fn extract_title(markdown: &str) -> Option<String> {
    let mut in_heading = false;
    let mut title = String::new();
    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Start(Tag::Heading(..)) => in_heading = true,
            Event::End(Tag::Heading(..)) => break,
            Event::Text(text) | Event::Code(text) if in_heading => title.push_str(&text),
            _ => {}
        }
    }
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_owned())
}

/// Extract the description from markdown content.
///
/// Take at most `limit` plain chars of the first paragraph with text.
/// Headings and images are skipped.
pub fn extract_description(markdown: &str, limit: usize) -> String {
    let mut paragraph: Option<Vec<Event>> = None;
    let mut in_image = false;
    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Start(Tag::Paragraph) => paragraph = Some(Vec::new()),
            Event::End(Tag::Paragraph) => {
                if let Some(events) = paragraph.take() {
                    let mut buffer = String::new();
                    html::push_html(&mut buffer, events.into_iter());
                    let text = to_plain_text(&buffer);
                    if !text.is_empty() {
                        return text.chars().take(limit).collect();
                    }
                }
            }
            Event::Start(Tag::Image(..)) => in_image = true,
            Event::End(Tag::Image(..)) => in_image = false,
            event => {
                if let Some(events) = paragraph.as_mut().filter(|_| !in_image) {
                    events.push(event);
                }
            }
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_render_html() {
        assert_eq!(
            render_html("# About Us\n\nWe are **49th Street**."),
            "<h1>About Us</h1>\n<p>We are <strong>49th Street</strong>.</p>\n"
        );
    }

    #[test]
    fn test_render_table() {
        let html = render_html("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.starts_with("<table>"));
    }

    #[test_case("# About Us\ntext", Some("About Us"); "h1")]
    #[test_case("\n\n## The `Shop`", Some("The Shop"); "h2 with code")]
    #[test_case("Just text", None; "no heading")]
    fn test_extract_title(markdown: &str, expected: Option<&str>) {
        assert_eq!(extract_title(markdown).as_deref(), expected);
    }

    #[test_case("aaaa", "aaaa"; "plain")]
    #[test_case("# h1\n\naaaa", "aaaa"; "skip heading")]
    #[test_case("![cover](cover.png)\n\naaaa", "aaaa"; "skip image")]
    #[test_case("Tems &amp; *Wizkid*\nagain", "Tems & Wizkid again"; "inline markup")]
    #[test_case("first\n\nsecond", "first"; "first paragraph")]
    #[test_case("# only heading", ""; "empty")]
    fn test_extract_description(markdown: &str, expected: &str) {
        assert_eq!(extract_description(markdown, 160), expected);
    }

    #[test]
    fn test_extract_description_at_most_limit_chars() {
        let markdown = "a".repeat(400);
        assert_eq!(extract_description(&markdown, 160), "a".repeat(160));
    }
}
