use std::sync::LazyLock;

use regex::Regex;

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<meta\b[^>]*>"#).expect("static regex"));
static META_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(name|content)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("static regex")
});

/// Value of cookie `name` in a `Cookie` header, percent-decoded.
pub fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
}

/// `content` of `<meta name="csrf-token">` in an HTML page.
pub fn meta_token(html: &str) -> Option<String> {
    META_TAG.find_iter(html).find_map(|tag| {
        let mut name = None;
        let mut content = None;
        for cap in META_ATTR.captures_iter(tag.as_str()) {
            let value = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str());
            match cap[1].to_ascii_lowercase().as_str() {
                "name" => name = value,
                "content" => content = value,
                _ => {}
            }
        }
        match (name, content) {
            (Some(n), Some(c)) if n.eq_ignore_ascii_case("csrf-token") && !c.is_empty() => {
                Some(c.to_string())
            }
            _ => None,
        }
    })
}

/// Cookie first, page meta tag second.
pub fn read_csrf_token(cookie_header: Option<&str>, page_html: Option<&str>) -> Option<String> {
    cookie_header
        .and_then(|h| cookie_value(h, CSRF_COOKIE))
        .filter(|t| !t.is_empty())
        .or_else(|| page_html.and_then(meta_token))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <meta charset="utf-8">
        <meta content="from-meta" name="csrf-token">
        </head><body></body></html>"#;

    #[test]
    fn cookie_wins_over_meta() {
        let token = read_csrf_token(Some("sessionid=abc; csrftoken=from-cookie"), Some(PAGE));
        assert_eq!(token.as_deref(), Some("from-cookie"));
    }

    #[test]
    fn falls_back_to_meta_tag() {
        let token = read_csrf_token(Some("sessionid=abc"), Some(PAGE));
        assert_eq!(token.as_deref(), Some("from-meta"));
        assert_eq!(read_csrf_token(None, Some(PAGE)).as_deref(), Some("from-meta"));
    }

    #[test]
    fn nothing_found_is_none() {
        assert_eq!(read_csrf_token(Some("sessionid=abc"), None), None);
        assert_eq!(read_csrf_token(None, Some("<meta name=\"viewport\" content=\"x\">")), None);
    }

    #[test]
    fn cookie_value_is_percent_decoded_and_exact() {
        assert_eq!(
            cookie_value("xcsrftoken=wrong; csrftoken=a%2Bb%3D", "csrftoken").as_deref(),
            Some("a+b=")
        );
        assert_eq!(cookie_value("csrftokenx=1", "csrftoken"), None);
    }
}
