//! Search-query and URL construction.

use reqwest::Url;

/// Build the `q` parameter of a search: the keyword (if any) followed by
/// `key:value` qualifiers, space-joined. Qualifiers with no value are
/// omitted entirely.
pub fn build_query(keyword: &str, qualifiers: &[(&str, Option<&str>)]) -> String {
    let quals = qualifiers
        .iter()
        .filter_map(|(key, value)| value.map(|v| format!("{}:{}", key, v)))
        .collect::<Vec<_>>()
        .join(" ");
    if keyword.is_empty() {
        quals
    } else if quals.is_empty() {
        keyword.to_string()
    } else {
        format!("{} {}", keyword, quals)
    }
}

/// Build a request URL from a base endpoint and query parameters,
/// percent-encoding values and omitting absent parameters.
///
/// # Panics
///
/// Panics when `base` is not a valid absolute URL. Every call site passes
/// one of the fixed API endpoint constants, which always parse.
pub fn build_url(base: &str, params: &[(&str, Option<String>)]) -> String {
    let present: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (*key, v)))
        .collect();
    Url::parse_with_params(base, &present)
        .expect("endpoint URL is valid")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_and_qualifiers_are_space_joined() {
        let q = build_query("foo", &[("stars", Some(">10")), ("language", None)]);
        assert_eq!(q, "foo stars:>10");
    }

    #[test]
    fn absent_qualifiers_are_omitted_entirely() {
        let q = build_query("", &[("size", None), ("language", Some("rust"))]);
        assert_eq!(q, "language:rust");
        assert!(!q.contains("None"));
    }

    #[test]
    fn empty_keyword_and_qualifiers_is_legal() {
        assert_eq!(build_query("", &[("language", None)]), "");
    }

    #[test]
    fn keyword_only_has_no_trailing_space() {
        assert_eq!(build_query("foo", &[("repo", None)]), "foo");
    }

    #[test]
    fn url_omits_absent_params_and_encodes_values() {
        let url = build_url(
            "https://api.github.com/search/commits",
            &[
                ("q", Some("foo repo:a/b".to_string())),
                ("sort", None),
                ("order", None),
                ("page", Some("1".to_string())),
                ("per_page", Some("100".to_string())),
            ],
        );
        assert_eq!(
            url,
            "https://api.github.com/search/commits?q=foo+repo%3Aa%2Fb&page=1&per_page=100"
        );
    }
}
