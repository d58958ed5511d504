use std::sync::LazyLock;

use regex::Regex;

/// `url += '<fragment>';` statements the redirect page uses to assemble the
/// real link. The spacing and quotes are matched exactly.
static FRAGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"url \+= '([^']+)';").expect("valid fragment regex"));

/// Canonical article URL prefix, used when no fragments are present.
pub const DEFAULT_ARTICLE_PATTERN: &str = r#"https://mp\.weixin\.qq\.com/s\?[^"']*"#;

/// Recovers the durable article URL from a redirect page body.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    article_re: Regex,
}

impl UrlResolver {
    pub fn new() -> Self {
        Self {
            article_re: Regex::new(DEFAULT_ARTICLE_PATTERN).expect("valid article regex"),
        }
    }

    /// Concatenate every `url += '...';` fragment in source order. With no
    /// fragments, fall back to the first literal article URL. `None` when
    /// neither is present.
    pub fn resolve(&self, redirect_page: &str) -> Option<String> {
        let fragments: String = FRAGMENT_RE
            .captures_iter(redirect_page)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect();

        if !fragments.is_empty() {
            return Some(fragments);
        }

        self.article_re
            .find(redirect_page)
            .map(|m| m.as_str().trim().to_string())
            .filter(|url| !url.is_empty())
    }
}

impl Default for UrlResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenates_fragments_in_order() {
        let body = "<script>var url = ''; url += 'https://example.com/s?'; url += 'id=42';\
                    window.location.replace(url);</script>";
        assert_eq!(
            UrlResolver::new().resolve(body).as_deref(),
            Some("https://example.com/s?id=42")
        );
    }

    #[test]
    fn test_many_fragments_across_lines() {
        let body = r#"
            var url = '';
            url += 'https://mp.';
            url += 'weixin.qq.com/s?src=11';
            url += '&timestamp=1700000000';
            url += '&signature=abc';
            url.replace("@", "");
        "#;
        assert_eq!(
            UrlResolver::new().resolve(body).as_deref(),
            Some("https://mp.weixin.qq.com/s?src=11&timestamp=1700000000&signature=abc")
        );
    }

    #[test]
    fn test_fragment_delimiters_are_exact() {
        // no space before +=, double quotes: neither counts as a fragment
        let body = "url+= 'a'; url += \"b\";";
        assert_eq!(UrlResolver::new().resolve(body), None);
    }

    #[test]
    fn test_falls_back_to_literal_url() {
        let body = r#"<a href="https://mp.weixin.qq.com/s?__biz=MzA&mid=1">read</a>"#;
        assert_eq!(
            UrlResolver::new().resolve(body).as_deref(),
            Some("https://mp.weixin.qq.com/s?__biz=MzA&mid=1")
        );
    }

    #[test]
    fn test_fragments_win_over_literal() {
        let body = "url += 'https://a.example/'; https://mp.weixin.qq.com/s?x=1";
        assert_eq!(
            UrlResolver::new().resolve(body).as_deref(),
            Some("https://a.example/")
        );
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(UrlResolver::new().resolve("<html>no link here</html>"), None);
        assert_eq!(UrlResolver::new().resolve(""), None);
    }
}
