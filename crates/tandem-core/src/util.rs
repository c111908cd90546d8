//! Small helpers shared by the config, store and transport layers.

/// Longest remote response body kept in logs and errors
pub const MAX_BODY_CHARS: usize = 180;

/// Trim `value`, treating blank strings as unset
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Base URL without trailing slashes, or `None` unless it is http(s)
pub fn http_base_url(value: &str) -> Option<&str> {
    let value = value.trim().trim_end_matches('/');
    let host = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))?;
    (!host.is_empty()).then_some(value)
}

/// First `MAX_BODY_CHARS` characters of a response body, single line
pub fn body_excerpt(body: &str) -> String {
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_BODY_CHARS)
        .collect()
}

/// Wall clock in unix milliseconds, the unit every stored timestamp uses
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_text_option_drops_blank_values() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(" \t".to_string())), None);
        assert_eq!(
            normalize_text_option(Some(" todoitem ".to_string())),
            Some("todoitem".to_string())
        );
    }

    #[test]
    fn http_base_url_requires_scheme_and_host() {
        assert_eq!(
            http_base_url(" https://todo.example.com// "),
            Some("https://todo.example.com")
        );
        assert_eq!(http_base_url("http://localhost:3000"), Some("http://localhost:3000"));
        assert_eq!(http_base_url("https://"), None);
        assert_eq!(http_base_url("todo.example.com"), None);
        assert_eq!(http_base_url("ftp://todo.example.com"), None);
    }

    #[test]
    fn body_excerpt_flattens_and_truncates() {
        assert_eq!(body_excerpt("{\n  \"error\": \"gone\"\n}"), "{ \"error\": \"gone\" }");
        assert_eq!(body_excerpt(&"x".repeat(500)).len(), MAX_BODY_CHARS);
    }
}
