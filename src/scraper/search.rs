use std::sync::LazyLock;

use ::scraper::{ElementRef, Html, Selector};
use chrono::{Local, TimeZone};
use regex::Regex;

use crate::domain::ArticleRecord;

/// The platform's own name, which shows up in place of real summaries and sources.
pub const PLATFORM_BOILERPLATE: &str = "微信公众平台";

/// Shortest paragraph (in characters, exclusive) accepted as a summary.
const MIN_SUMMARY_CHARS: usize = 20;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid listing selector")
}

static ITEM_SEL: LazyLock<Selector> = LazyLock::new(|| selector("ul.news-list li"));
static TITLE_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| selector("h3 a"));
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| selector("h3"));
static PARAGRAPH_SEL: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static SOURCE_SEL: LazyLock<Selector> = LazyLock::new(|| selector("div.s-p span.all-time-y2"));
static TIME_SCRIPT_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector("div.s-p span.s2 script"));

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{1,2}-\d{1,2}").expect("valid date regex"));
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"今日|昨日|\d+小时前|\d+分钟前").expect("valid relative time regex")
});
static TIME_CONVERT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"timeConvert\('(\d+)'\)").expect("valid timeConvert regex"));

/// Parses a search listing page into article records, in document order.
#[derive(Debug, Clone)]
pub struct SearchResultParser {
    base_url: String,
}

impl SearchResultParser {
    /// `base_url` is joined to site-relative result links.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Items without a title are skipped; nothing else is required.
    pub fn parse(&self, listing_page: &str) -> Vec<ArticleRecord> {
        let document = Html::parse_document(listing_page);
        document
            .select(&ITEM_SEL)
            .filter_map(|item| self.parse_item(item))
            .collect()
    }

    fn parse_item(&self, item: ElementRef<'_>) -> Option<ArticleRecord> {
        let title_link = item.select(&TITLE_LINK_SEL).next();
        let title = title_link
            .or_else(|| item.select(&TITLE_SEL).next())
            .map(normalized_text)
            .unwrap_or_default();
        if title.is_empty() {
            return None;
        }

        let mut record = ArticleRecord::new(title);

        record.summary = item
            .select(&PARAGRAPH_SEL)
            .map(normalized_text)
            .find(|text| is_summary(text))
            .map(|text| ArticleRecord::clip_summary(&text));

        if let Some(href) = title_link.and_then(|a| a.value().attr("href")) {
            record.indirect_url = self.absolute(href.trim());
        }

        record.source = item
            .select(&SOURCE_SEL)
            .next()
            .map(normalized_text)
            .filter(|source| !source.is_empty() && source != PLATFORM_BOILERPLATE);

        record.publish_time = item
            .select(&TIME_SCRIPT_SEL)
            .next()
            .and_then(|script| publish_time_from_script(&script.text().collect::<String>()));

        Some(record)
    }

    fn absolute(&self, href: &str) -> String {
        if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            href.to_string()
        }
    }
}

/// Element text with its text nodes joined as-is and the ends trimmed.
///
/// Highlighted keywords arrive as `<em>` children, so nothing is inserted at
/// element boundaries.
fn normalized_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn is_summary(text: &str) -> bool {
    text.chars().count() > MIN_SUMMARY_CHARS
        && !DATE_RE.is_match(text)
        && !RELATIVE_TIME_RE.is_match(text)
        && !text.contains(PLATFORM_BOILERPLATE)
}

/// Pull the unix timestamp out of a `timeConvert('<secs>')` call and format it
/// in local time.
pub fn publish_time_from_script(script: &str) -> Option<String> {
    let secs: i64 = TIME_CONVERT_RE.captures(script)?.get(1)?.as_str().parse().ok()?;
    format_unix_local(secs)
}

pub fn format_unix_local(secs: i64) -> Option<String> {
    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://weixin.sogou.com";

    fn listing(items: &str) -> String {
        format!(
            "<html><body><div class=\"news-box\"><ul class=\"news-list\">{}</ul></div></body></html>",
            items
        )
    }

    #[test]
    fn test_single_item_without_time() {
        let page = listing(r#"<li><div class="txt-box"><h3><a href="/link?url=abc">Test Article</a></h3></div></li>"#);
        let records = SearchResultParser::new(BASE).parse(&page);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Test Article");
        assert!(records[0].publish_time.is_none());
        assert_eq!(records[0].indirect_url, "https://weixin.sogou.com/link?url=abc");
        assert!(!records[0].resolved);
        assert!(!records[0].content_fetched);
    }

    #[test]
    fn test_full_item() {
        let page = listing(
            r#"<li>
                <div class="txt-box">
                  <h3><a target="_blank" href="https://weixin.sogou.com/link?url=xyz">
                      养老 <em>机器人</em> 新进展</a></h3>
                  <p class="txt-info">2024-05-01</p>
                  <p class="txt-info">这是一段足够长的文章摘要内容，用于测试摘要提取逻辑是否正确工作。</p>
                  <div class="s-p">
                    <span class="all-time-y2">科技日报</span>
                    <span class="s2"><script>document.write(timeConvert('1700000000'))</script></span>
                  </div>
                </div>
              </li>"#,
        );
        let records = SearchResultParser::new(BASE).parse(&page);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.title, "养老 机器人 新进展");
        assert_eq!(
            record.summary.as_deref(),
            Some("这是一段足够长的文章摘要内容，用于测试摘要提取逻辑是否正确工作。")
        );
        assert_eq!(record.source.as_deref(), Some("科技日报"));
        assert_eq!(record.publish_time, format_unix_local(1_700_000_000));
        assert_eq!(record.indirect_url, "https://weixin.sogou.com/link?url=xyz");
    }

    #[test]
    fn test_highlighted_keyword_joins_surrounding_text() {
        let page = listing(
            r#"<li>
                <h3><a href="/link?url=hl">关于<em><!--red_beg-->养老<!--red_end--></em>的政策解读</a></h3>
                <p class="txt-info">近日多地出台<em><!--red_beg-->养老<!--red_end--></em>服务新规，进一步完善社区居家服务体系。</p>
              </li>"#,
        );
        let records = SearchResultParser::new(BASE).parse(&page);

        assert_eq!(records[0].title, "关于养老的政策解读");
        assert_eq!(
            records[0].summary.as_deref(),
            Some("近日多地出台养老服务新规，进一步完善社区居家服务体系。")
        );
    }

    #[test]
    fn test_items_without_title_are_dropped() {
        let page = listing(
            r#"<li><h3><a href="/a">First</a></h3></li>
               <li><h3><a href="/b">   </a></h3></li>
               <li><p>no heading at all, just a paragraph of text</p></li>
               <li><h3>Heading Only</h3></li>"#,
        );
        let records = SearchResultParser::new(BASE).parse(&page);

        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Heading Only"]);
        assert!(records[1].indirect_url.is_empty());
    }

    #[test]
    fn test_summary_filters() {
        let page = listing(
            r#"<li><h3><a href="/a">T</a></h3>
                <p>too short</p>
                <p>Published on 2023-12-31 somewhere far away today</p>
                <p>这篇文章发表于3小时前，内容非常丰富而且很有意思哦</p>
                <p>来自微信公众平台的推荐内容，这里是一段很长的文本</p>
                <p>An adequately long summary paragraph that should be kept.</p>
            </li>"#,
        );
        let records = SearchResultParser::new(BASE).parse(&page);
        assert_eq!(
            records[0].summary.as_deref(),
            Some("An adequately long summary paragraph that should be kept.")
        );
    }

    #[test]
    fn test_long_summary_is_clipped() {
        let long = "摘".repeat(400);
        let page = listing(&format!(r#"<li><h3><a href="/a">T</a></h3><p>{}</p></li>"#, long));
        let summary = SearchResultParser::new(BASE).parse(&page)[0]
            .summary
            .clone()
            .unwrap();
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), 303);
    }

    #[test]
    fn test_boilerplate_source_ignored() {
        let page = listing(
            r#"<li><h3><a href="/a">T</a></h3>
               <div class="s-p"><span class="all-time-y2">微信公众平台</span></div></li>"#,
        );
        assert!(SearchResultParser::new(BASE).parse(&page)[0].source.is_none());
    }

    #[test]
    fn test_document_order_preserved() {
        let items: String = (1..=5)
            .map(|i| format!(r#"<li><h3><a href="/l{i}">Article {i}</a></h3></li>"#))
            .collect();
        let records = SearchResultParser::new(BASE).parse(&listing(&items));
        let titles: Vec<_> = records.iter().map(|r| r.title.clone()).collect();
        assert_eq!(
            titles,
            vec!["Article 1", "Article 2", "Article 3", "Article 4", "Article 5"]
        );
    }

    #[test]
    fn test_page_without_listing() {
        assert!(SearchResultParser::new(BASE)
            .parse("<html><body><div>antispider</div></body></html>")
            .is_empty());
    }

    #[test]
    fn test_publish_time_from_script() {
        assert_eq!(
            publish_time_from_script("document.write(timeConvert('86400'))"),
            format_unix_local(86_400)
        );
        assert_eq!(publish_time_from_script("timeConvert(86400)"), None);
        assert_eq!(publish_time_from_script(""), None);

        let formatted = format_unix_local(1_700_000_000).unwrap();
        assert_eq!(formatted.len(), "2023-11-14 22:13:20".len());
    }
}
