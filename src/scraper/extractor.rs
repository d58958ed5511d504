use std::sync::LazyLock;

use ::scraper::{ElementRef, Html, Selector};
use regex::Regex;
use tracing::warn;

use crate::scraper::ExtractorConfig;

static BODY_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body[\s>/]").expect("valid body regex"));

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

/// Extracts clean article text from an arbitrary page.
pub struct ContentExtractor {
    content_selectors: Vec<Selector>,
    remove_selectors: Vec<Selector>,
}

impl ContentExtractor {
    /// Compile the configured selectors. Invalid ones are logged and skipped.
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            content_selectors: compile(&config.content_selectors),
            remove_selectors: compile(&config.remove_selectors),
        }
    }

    /// Text of the first matching content container, one line per text node.
    ///
    /// Falls back to the page body when no container matches (or the match
    /// is empty). Never fails: a page with nothing usable yields `""`.
    pub fn extract(&self, page: &str) -> String {
        let document = Html::parse_document(page);

        let primary = self
            .content_selectors
            .iter()
            .find_map(|selector| document.select(selector).next())
            .map(|element| self.element_text(element))
            .unwrap_or_default();

        let text = if primary.is_empty() && BODY_TAG_RE.is_match(page) {
            document
                .select(&BODY_SELECTOR)
                .next()
                .map(|element| self.element_text(element))
                .unwrap_or_default()
        } else {
            primary
        };

        clean_lines(&text)
    }

    fn element_text(&self, element: ElementRef<'_>) -> String {
        element
            .descendants()
            .filter_map(|node| {
                let text = node.value().as_text()?;
                let removed = node
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|ancestor| self.remove_selectors.iter().any(|s| s.matches(&ancestor)));
                (!removed).then(|| text.trim().to_string())
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default())
    }
}

fn compile(selectors: &[String]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|css| match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Ignoring invalid selector {:?}: {:?}", css, e);
                None
            }
        })
        .collect()
}

/// Trim every line and drop blank ones.
fn clean_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_platform_container() {
        let page = r#"
            <html><body>
              <div class="content">generic</div>
              <div id="js_content"><p>  First paragraph  </p><p>Second <b>bold</b></p></div>
            </body></html>
        "#;
        assert_eq!(
            ContentExtractor::default().extract(page),
            "First paragraph\nSecond\nbold"
        );
    }

    #[test]
    fn test_drops_script_and_style() {
        let page = r#"
            <html><body><article>
              <style>.x { color: red }</style>
              <p>Visible</p>
              <script>var hidden = 1;</script>
            </article></body></html>
        "#;
        assert_eq!(ContentExtractor::default().extract(page), "Visible");
    }

    #[test]
    fn test_selector_priority_order() {
        let page = r#"<html><body>
            <article>from article</article>
            <div class="rich_media_content">from rich media</div>
        </body></html>"#;
        assert_eq!(ContentExtractor::default().extract(page), "from rich media");
    }

    #[test]
    fn test_falls_back_to_body() {
        let page = "<html><body><div>Line one</div>\n\n<div>   </div><div>Line two</div></body></html>";
        assert_eq!(ContentExtractor::default().extract(page), "Line one\nLine two");
    }

    #[test]
    fn test_empty_container_falls_back_to_body() {
        let page = "<html><body><div id=\"js_content\"> </div><p>Outside</p></body></html>";
        assert_eq!(ContentExtractor::default().extract(page), "Outside");
    }

    #[test]
    fn test_no_selector_and_no_body_is_empty() {
        let extractor = ContentExtractor::default();
        assert_eq!(extractor.extract(""), "");
        assert_eq!(extractor.extract("<p>stray fragment</p>"), "");
        assert_eq!(extractor.extract("plain text without markup"), "");
    }

    #[test]
    fn test_collapses_multiline_text_nodes() {
        let page = "<html><body><article>\n  a  \n\n\n  b\n</article></body></html>";
        assert_eq!(ContentExtractor::default().extract(page), "a\nb");
    }

    #[test]
    fn test_invalid_selectors_are_skipped() {
        let config = ExtractorConfig {
            content_selectors: vec!["[[[".into(), "main".into()],
            remove_selectors: vec![],
        };
        let extractor = ContentExtractor::new(&config);
        assert_eq!(extractor.extract("<html><body><main>ok</main></body></html>"), "ok");
    }
}
