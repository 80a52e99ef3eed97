use serde_json::Value;

use super::MetaMap;

/// Merge the default meta, the root route's meta and the leaf route's
/// meta, each later one overriding the earlier key by key.
pub fn merge_meta(base: &MetaMap, root: &MetaMap, leaf: &MetaMap) -> MetaMap {
    let mut merged = base.clone();
    for (key, value) in root.iter().chain(leaf.iter()) {
        merged.insert(key.clone(), value.clone());
    }
    exclude_current_locale(&mut merged);
    merged
}

/// Remove the value of `locale` from `locales`, dropping `locales` once
/// empty, so that the current locale is never advertised as an alternate.
pub fn exclude_current_locale(meta: &mut MetaMap) {
    let Some(Value::String(locale)) = meta.get("locale").cloned() else {
        return;
    };
    let remove = match meta.get_mut("locales") {
        Some(Value::Array(locales)) => {
            locales.retain(|value| value.as_str() != Some(locale.as_str()));
            locales.is_empty()
        }
        Some(Value::String(single)) => *single == locale,
        _ => false,
    };
    if remove {
        meta.remove("locales");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> MetaMap {
        match value {
            Value::Object(map) => map,
            _ => MetaMap::new(),
        }
    }

    #[test]
    fn leaf_overrides_root_overrides_base() {
        let merged = merge_meta(
            &map(json!({"siteName": "Site", "title": "Base", "type": "website"})),
            &map(json!({"title": "Root", "image": "/root.png"})),
            &map(json!({"title": "Leaf", "type": "article"})),
        );
        assert_eq!(
            Value::Object(merged),
            json!({
                "siteName": "Site",
                "title": "Leaf",
                "type": "article",
                "image": "/root.png",
            })
        );
    }

    #[test]
    fn current_locale_not_alternate() {
        let merged = merge_meta(
            &MetaMap::new(),
            &map(json!({"locales": ["en", "ru", "de"]})),
            &map(json!({"locale": "ru"})),
        );
        assert_eq!(merged.get("locales"), Some(&json!(["en", "de"])));

        let merged = merge_meta(
            &MetaMap::new(),
            &map(json!({"locale": "ru", "locales": ["ru"]})),
            &MetaMap::new(),
        );
        assert_eq!(merged.get("locales"), None);
        assert_eq!(merged.get("locale"), Some(&json!("ru")));
    }
}
