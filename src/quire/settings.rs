use crate::error::{QuireError, Result};
use crate::images::ReferenceScheme;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

const SETTINGS_FILENAME: &str = "settings.json";
const DEFAULT_AUTOSAVE_DELAY_SECS: u64 = 3;

/// Keys accepted by [`Settings::get`] and [`Settings::set`].
pub const KEYS: &[&str] = &[
    "darkMode",
    "autosave",
    "autosaveDelaySecs",
    "defaultView",
    "imageScheme",
    "backend",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultView {
    #[default]
    Preview,
    Editor,
    Split,
}

impl fmt::Display for DefaultView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultView::Preview => f.write_str("preview"),
            DefaultView::Editor => f.write_str("editor"),
            DefaultView::Split => f.write_str("split"),
        }
    }
}

impl FromStr for DefaultView {
    type Err = QuireError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "preview" => Ok(DefaultView::Preview),
            "editor" => Ok(DefaultView::Editor),
            "split" => Ok(DefaultView::Split),
            other => Err(QuireError::InvalidSetting(format!(
                "defaultView must be preview, editor or split, got '{}'",
                other
            ))),
        }
    }
}

/// Which storage backend to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Files when the data directory is usable, the cache document otherwise.
    #[default]
    Auto,
    Files,
    Cache,
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendChoice::Auto => f.write_str("auto"),
            BackendChoice::Files => f.write_str("files"),
            BackendChoice::Cache => f.write_str("cache"),
        }
    }
}

impl FromStr for BackendChoice {
    type Err = QuireError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(BackendChoice::Auto),
            "files" => Ok(BackendChoice::Files),
            "cache" => Ok(BackendChoice::Cache),
            other => Err(QuireError::InvalidSetting(format!(
                "backend must be auto, files or cache, got '{}'",
                other
            ))),
        }
    }
}

/// User settings, stored in `<data root>/settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub dark_mode: bool,

    /// Save edits in the background after a quiet period
    #[serde(default = "default_autosave")]
    pub autosave: bool,

    #[serde(default = "default_autosave_delay")]
    pub autosave_delay_secs: u64,

    #[serde(default)]
    pub default_view: DefaultView,

    /// Scheme used for newly attached image references
    #[serde(default)]
    pub image_scheme: ReferenceScheme,

    #[serde(default)]
    pub backend: BackendChoice,
}

fn default_autosave() -> bool {
    true
}

fn default_autosave_delay() -> u64 {
    DEFAULT_AUTOSAVE_DELAY_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            autosave: default_autosave(),
            autosave_delay_secs: default_autosave_delay(),
            default_view: DefaultView::default(),
            image_scheme: ReferenceScheme::default(),
            backend: BackendChoice::default(),
        }
    }
}

impl Settings {
    /// Load settings from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(SETTINGS_FILENAME);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(QuireError::Io)?;
        let settings: Settings = serde_json::from_str(&content).map_err(QuireError::Serialization)?;
        Ok(settings)
    }

    /// Save settings to the given directory
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();

        if !dir.exists() {
            fs::create_dir_all(dir).map_err(QuireError::Io)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(QuireError::Serialization)?;
        fs::write(dir.join(SETTINGS_FILENAME), content).map_err(QuireError::Io)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "darkMode" => self.dark_mode.to_string(),
            "autosave" => self.autosave.to_string(),
            "autosaveDelaySecs" => self.autosave_delay_secs.to_string(),
            "defaultView" => self.default_view.to_string(),
            "imageScheme" => self.image_scheme.to_string(),
            "backend" => self.backend.to_string(),
            other => return Err(unknown_key(other)),
        };
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "darkMode" => self.dark_mode = parse_bool(key, value)?,
            "autosave" => self.autosave = parse_bool(key, value)?,
            "autosaveDelaySecs" => {
                self.autosave_delay_secs = value.parse().map_err(|_| {
                    QuireError::InvalidSetting(format!(
                        "{} must be a whole number of seconds, got '{}'",
                        key, value
                    ))
                })?
            }
            "defaultView" => self.default_view = value.parse()?,
            "imageScheme" => self.image_scheme = value.parse()?,
            "backend" => self.backend = value.parse()?,
            other => return Err(unknown_key(other)),
        }
        Ok(())
    }

    /// All settings as key/value pairs, in [`KEYS`] order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        KEYS.iter()
            .filter_map(|key| self.get(key).ok().map(|v| (*key, v)))
            .collect()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "on" | "yes" => Ok(true),
        "false" | "off" | "no" => Ok(false),
        other => Err(QuireError::InvalidSetting(format!(
            "{} must be true or false, got '{}'",
            key, other
        ))),
    }
}

fn unknown_key(key: &str) -> QuireError {
    QuireError::InvalidSetting(format!(
        "unknown setting '{}' (expected one of: {})",
        key,
        KEYS.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.dark_mode);
        assert!(settings.autosave);
        assert_eq!(settings.autosave_delay_secs, 3);
        assert_eq!(settings.default_view, DefaultView::Preview);
        assert_eq!(settings.image_scheme, ReferenceScheme::Public);
        assert_eq!(settings.backend, BackendChoice::Auto);
    }

    #[test]
    fn test_load_missing_settings() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path().join("nowhere")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested");

        let mut settings = Settings::default();
        settings.set("darkMode", "true").unwrap();
        settings.set("imageScheme", "custom").unwrap();
        settings.save(&dir).unwrap();

        let loaded = Settings::load(&dir).unwrap();
        assert!(loaded.dark_mode);
        assert_eq!(loaded.image_scheme, ReferenceScheme::Custom);
    }

    #[test]
    fn test_partial_document_takes_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"darkMode": true}"#).unwrap();
        assert!(settings.dark_mode);
        assert!(settings.autosave);
        assert_eq!(settings.autosave_delay_secs, 3);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["defaultView"], "preview");
        assert_eq!(json["autosaveDelaySecs"], 3);
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set("fontSize", "12"),
            Err(QuireError::InvalidSetting(_))
        ));
        assert!(settings.set("autosave", "maybe").is_err());
        assert!(settings.set("defaultView", "grid").is_err());
        assert!(settings.set("autosaveDelaySecs", "-1").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_get_round_trips_set() {
        let mut settings = Settings::default();
        settings.set("defaultView", "split").unwrap();
        settings.set("autosaveDelaySecs", "10").unwrap();
        assert_eq!(settings.get("defaultView").unwrap(), "split");
        assert_eq!(settings.get("autosaveDelaySecs").unwrap(), "10");
        assert_eq!(settings.entries().len(), KEYS.len());
    }
}
