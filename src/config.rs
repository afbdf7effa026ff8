use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use dirs::data_dir;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::launcher::LauncherTarget;

const CONFIG_DIR: &str = "Classify";
const CONFIG_FILE: &str = "settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    Auto,
}

/// User settings shared with the UI. The UI always resubmits the whole record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Extension (lower-case, leading dot) to launcher path or `shell:` token.
    pub editors: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub auto_updates_enabled: bool,
    /// Keys this build does not know about, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            editors: BTreeMap::new(),
            theme: None,
            user_name: None,
            auto_updates_enabled: true,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Shallow-merges an arbitrary JSON record over the defaults. Fields of
    /// the wrong type keep their default value.
    pub fn from_value(value: Value) -> Self {
        let mut settings = Self::default();
        let Value::Object(mut fields) = value else {
            return settings;
        };

        if let Some(Value::Object(editors)) = fields.remove("editors") {
            settings.editors = normalize_editors(
                editors
                    .into_iter()
                    .filter_map(|(ext, launcher)| match launcher {
                        Value::String(launcher) => Some((ext, launcher)),
                        _ => None,
                    }),
            );
        }

        if let Some(theme) = fields.remove("theme") {
            settings.theme = serde_json::from_value(theme).ok();
        }

        if let Some(Value::String(name)) = fields.remove("userName") {
            settings.user_name = Some(name);
        }

        if let Some(Value::Bool(enabled)) = fields.remove("autoUpdatesEnabled") {
            settings.auto_updates_enabled = enabled;
        }

        settings.extra = fields;
        settings
    }

    pub fn normalized(mut self) -> Self {
        self.editors = normalize_editors(self.editors);
        self
    }

    /// Configured launcher for `file`, keyed on its lower-cased extension.
    pub fn launcher_for(&self, file: &Path) -> Option<LauncherTarget> {
        let ext = extension_key(file)?;
        self.editors
            .get(&ext)
            .and_then(|value| LauncherTarget::parse(value))
    }
}

fn normalize_editors<I>(entries: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    entries
        .into_iter()
        .filter_map(|(ext, launcher)| {
            let launcher = launcher.trim();
            if launcher.is_empty() {
                return None;
            }
            normalize_extension(&ext).map(|ext| (ext, launcher.to_string()))
        })
        .collect()
}

/// `"MD"`, `".md"` and `" .Md "` all become `".md"`; blank input is rejected.
pub fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.').to_lowercase();
    if trimmed.is_empty() {
        None
    } else {
        Some(format!(".{trimmed}"))
    }
}

pub fn extension_key(file: &Path) -> Option<String> {
    file.extension()
        .and_then(|ext| normalize_extension(&ext.to_string_lossy()))
}

pub fn config_dir() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(CONFIG_DIR))
}

pub fn config_file_path() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from(".").join(CONFIG_DIR))
        .join(CONFIG_FILE)
}

/// Per-user settings file. Concurrent saves are last-write-wins.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_default_location() -> Self {
        Self::new(config_file_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Settings {
        match self.read() {
            Ok(settings) => settings,
            Err(error) => {
                log::warn!("Falling back to default settings: {error}");
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> bool {
        match self.persist(settings) {
            Ok(()) => true,
            Err(error) => {
                log::error!("Failed to save settings: {error}");
                false
            }
        }
    }

    fn read(&self) -> Result<Settings, ConfigError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(Settings::default())
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let value = serde_json::from_str::<Value>(&raw).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Settings::from_value(value))
    }

    fn persist(&self, settings: &Settings) -> Result<(), ConfigError> {
        let write_error = |source: io::Error| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(write_error)?;
        }

        let normalized = settings.clone().normalized();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| write_error(io::Error::new(io::ErrorKind::InvalidData, error)))?;

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialized).map_err(write_error)?;
        fs::rename(&staging, &self.path).map_err(write_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> SettingsStore {
        SettingsStore::new(temp.path().join("Classify").join(CONFIG_FILE))
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = store_in(&temp).load();

        assert!(settings.editors.is_empty());
        assert!(settings.auto_updates_enabled);
        assert_eq!(settings.theme, None);

        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value, json!({ "editors": {}, "autoUpdatesEnabled": true }));
    }

    #[test]
    fn test_invalid_json_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ editors: nope").unwrap();

        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn test_partial_record_is_merged_over_defaults() {
        let settings = Settings::from_value(json!({
            "theme": "dark",
            "userName": "Camille",
        }));

        assert_eq!(settings.theme, Some(Theme::Dark));
        assert_eq!(settings.user_name.as_deref(), Some("Camille"));
        assert!(settings.auto_updates_enabled);
        assert!(settings.editors.is_empty());
    }

    #[test]
    fn test_malformed_fields_keep_defaults() {
        let settings = Settings::from_value(json!({
            "editors": ["not", "a", "map"],
            "theme": "sepia",
            "autoUpdatesEnabled": "yes",
        }));

        assert!(settings.editors.is_empty());
        assert_eq!(settings.theme, None);
        assert!(settings.auto_updates_enabled);

        assert_eq!(Settings::from_value(json!(42)), Settings::default());
    }

    #[test]
    fn test_editor_keys_are_normalized() {
        let settings = Settings::from_value(json!({
            "editors": {
                ".MD": "/usr/bin/gedit",
                "docx": "shell:AppsFolder\\Word",
                ".txt": "",
                ".odt": 12,
                "  ": "/usr/bin/kate",
            }
        }));

        let keys: Vec<_> = settings.editors.keys().cloned().collect();
        assert_eq!(keys, vec![".docx", ".md"]);
        assert_eq!(settings.editors[".md"], "/usr/bin/gedit");
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let mut settings = Settings::default();
        settings.editors.insert(".md".into(), "/usr/bin/gedit".into());
        settings.editors.insert(".pdf".into(), "   ".into());
        settings.theme = Some(Theme::Auto);
        settings.auto_updates_enabled = false;

        assert!(store.save(&settings));
        assert!(store.path().exists());

        let loaded = store.load();
        assert_eq!(loaded.editors.len(), 1);
        assert_eq!(loaded.theme, Some(Theme::Auto));
        assert!(!loaded.auto_updates_enabled);
    }

    #[test]
    fn test_unknown_keys_survive_a_save() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            r#"{ "editors": {}, "emojiStyle": "native" }"#,
        )
        .unwrap();

        let settings = store.load();
        assert!(store.save(&settings));

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["emojiStyle"], "native");
    }

    #[test]
    fn test_save_failure_returns_false() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let store = SettingsStore::new(blocker.join(CONFIG_FILE));
        assert!(!store.save(&Settings::default()));
    }

    #[test]
    fn test_launcher_lookup_uses_lowercase_extension() {
        let mut settings = Settings::default();
        settings.editors.insert(".md".into(), "/usr/bin/gedit".into());

        assert_eq!(
            settings.launcher_for(Path::new("Notes/Chapitre 1.MD")),
            Some(LauncherTarget::Executable(PathBuf::from("/usr/bin/gedit")))
        );
        assert_eq!(settings.launcher_for(Path::new("notes.txt")), None);
        assert_eq!(settings.launcher_for(Path::new("README")), None);
    }
}
