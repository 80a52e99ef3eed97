use serde_json::Value;

use super::{merge::exclude_current_locale, MetaMap, MetaTag};

/// The canonical tag names of a shorthand key, `None` for keys which are
/// passed through.
fn canonical_names(key: &str) -> Option<&'static [&'static str]> {
    let names: &'static [&'static str] = match key {
        "description" => &["description", "og:description"],
        "siteName" => &["og:site_name"],
        "title" => &["og:title"],
        "image" => &["og:image"],
        "locale" => &["og:locale"],
        "type" => &["og:type"],
        "url" => &["og:url"],
        "audio" => &["og:audio"],
        "video" => &["og:video"],
        "locales" => &["og:locale:alternate"],
        _ => return None,
    };
    Some(names)
}

/// Escape a string for use inside HTML text or a quoted attribute.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn expand(name: &str, value: &Value, out: &mut Vec<MetaTag>) {
    match value {
        Value::Null => (),
        Value::Array(items) => items.iter().for_each(|item| expand(name, item, out)),
        Value::Object(fields) => fields
            .iter()
            .for_each(|(key, value)| expand(&format!("{name}:{key}"), value, out)),
        Value::String(s) => out.push(MetaTag::new(name, s.as_str())),
        Value::Bool(b) => out.push(MetaTag::new(name, b.to_string())),
        Value::Number(n) => out.push(MetaTag::new(name, n.to_string())),
    }
}

/// Map a merged meta object to the list of tags to apply.
///
/// Shorthand keys map to their canonical names, with `description`
/// fanning out to the bare and the `og:` tag.  `charset` is dropped as the
/// server shell renders it separately.  Nested objects expand to
/// colon-joined names and arrays to repeated tags.
pub fn normalize_meta(meta: &MetaMap) -> Vec<MetaTag> {
    let mut meta = meta.clone();
    exclude_current_locale(&mut meta);

    let mut tags = Vec::new();
    for (key, value) in &meta {
        if key == "charset" {
            continue;
        }
        match canonical_names(key) {
            Some(names) => names.iter().for_each(|name| expand(name, value, &mut tags)),
            None => expand(&escape_html(key), value, &mut tags),
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(value: Value) -> Vec<(String, String)> {
        let Value::Object(map) = value else {
            return vec![];
        };
        normalize_meta(&map)
            .into_iter()
            .map(|tag| (tag.name, tag.value))
            .collect()
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn shorthand_keys() {
        assert_eq!(
            tags(json!({
                "charset": "utf-8",
                "description": "Desc",
                "siteName": "Site",
                "url": "https://example.com/",
            })),
            pairs(&[
                ("description", "Desc"),
                ("og:description", "Desc"),
                ("og:site_name", "Site"),
                ("og:url", "https://example.com/"),
            ]),
        );
    }

    #[test]
    fn self_locale_excluded() {
        assert_eq!(
            tags(json!({"title": "T", "locale": "ru", "locales": ["en", "ru"]})),
            pairs(&[
                ("og:title", "T"),
                ("og:locale", "ru"),
                ("og:locale:alternate", "en"),
            ]),
        );
    }

    #[test]
    fn nested_and_arrays() {
        assert_eq!(
            tags(json!({
                "image": [
                    {"url": "/a.png", "width": 100},
                    {"url": "/b.png", "alt": null},
                ],
                "article": {"author": ["x", "y"], "section": {"name": "news"}},
                "robots": true,
            })),
            pairs(&[
                ("og:image:url", "/a.png"),
                ("og:image:width", "100"),
                ("og:image:url", "/b.png"),
                ("article:author", "x"),
                ("article:author", "y"),
                ("article:section:name", "news"),
                ("robots", "true"),
            ]),
        );
    }

    #[test]
    fn unknown_keys_escaped() {
        assert_eq!(
            tags(json!({"x\"onload=\"y": "v"})),
            pairs(&[("x&quot;onload=&quot;y", "v")]),
        );
        assert_eq!(escape_html("<a href='x'>&</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt;");
    }
}
