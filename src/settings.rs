use serde::Deserialize;

use crate::{error::StructuralError, meta::MetaMap};

/// Application settings for navigation and rendering.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    /// Whether pages are rendered on the server.  When disabled, every
    /// loader runs on the client, and the initial client-side navigation
    /// signals a synthetic resolve.
    pub ssr: bool,
    /// Redirects followed by a single client-side navigation.
    pub max_redirects: usize,
    /// The meta every page starts from.
    pub default_meta: MetaMap,
    /// Custom context handed to every loader.
    pub context: serde_json::Value,
    /// DOM id of the embedded state snapshot.
    pub state_id: String,
    /// Whether the snapshot is accompanied by the ISO-8601 date reviver.
    pub date_reviver: bool,
    /// Prefix of the context store keys surviving navigation boundaries.
    pub persistent_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ssr: true,
            max_redirects: 5,
            default_meta: MetaMap::new(),
            context: serde_json::Value::Null,
            state_id: "__STATE__".to_string(),
            date_reviver: true,
            persistent_prefix: "@@nav/".to_string(),
        }
    }
}

impl Settings {
    pub fn from_json(input: &str) -> Result<Self, StructuralError> {
        let settings: Self = serde_json::from_str(input)
            .map_err(|e| StructuralError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), StructuralError> {
        if self.persistent_prefix.is_empty() {
            return Err(StructuralError::InvalidSettings(
                "`persistentPrefix` must not be empty".to_string(),
            ));
        }
        if self.state_id.is_empty() {
            return Err(StructuralError::InvalidSettings(
                "`stateId` must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing() {
        let settings = Settings::from_json(r#"{"ssr": false, "defaultMeta": {"siteName": "S"}}"#)
            .expect("valid settings");
        assert!(!settings.ssr);
        assert_eq!(settings.max_redirects, 5);
        assert_eq!(settings.default_meta.get("siteName"), Some(&serde_json::json!("S")));
        assert_eq!(settings.persistent_prefix, "@@nav/");
    }

    #[test]
    fn invalid_settings() {
        assert!(matches!(
            Settings::from_json(r#"{"ssr": "yes"}"#),
            Err(StructuralError::InvalidSettings(_))
        ));
        assert!(matches!(
            Settings::from_json(r#"{"unknown": 1}"#),
            Err(StructuralError::InvalidSettings(_))
        ));
        assert!(matches!(
            Settings::from_json(r#"{"persistentPrefix": ""}"#),
            Err(StructuralError::InvalidSettings(_))
        ));
    }
}
