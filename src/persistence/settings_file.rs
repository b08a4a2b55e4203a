//! JSON settings file in the user's configuration directory

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::error::SettingsError;
use crate::core::Settings;
use crate::APP_NAME;

/// Settings stored as pretty-printed JSON
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    /// Settings file at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/OmniSky/settings.json`
    pub fn default_location() -> Result<Self, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(dir.join(APP_NAME).join("settings.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate settings, writing defaults on first run
    pub fn load_or_create(&self) -> Result<Settings, SettingsError> {
        match self.load()? {
            Some(settings) => Ok(settings),
            None => {
                let settings = Settings::default();
                if let Err(e) = self.save(&settings) {
                    // Running with defaults is fine when the directory is read-only
                    warn!("Could not write default settings: {}", e);
                }
                Ok(settings)
            }
        }
    }

    /// Load settings; `None` if the file does not exist yet
    pub fn load(&self) -> Result<Option<Settings>, SettingsError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut settings: Settings =
            serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
                path: self.path.clone(),
                source,
            })?;
        settings.validate();
        debug!("Settings loaded from {:?}", self.path);
        Ok(Some(settings))
    }

    /// Save settings through a temporary file so readers never see a torn write
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;

        info!("Settings saved to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("nested").join("settings.json"));

        let settings = file.load_or_create().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(file.path().exists());
    }

    #[test]
    fn saved_settings_are_validated_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));

        let settings = Settings {
            heavy_processes: vec!["obs64".into()],
            monitor_interval_ms: 10,
            ..Default::default()
        };
        file.save(&settings).unwrap();

        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded.heavy_processes, vec!["obs64".to_string()]);
        assert_eq!(loaded.monitor_interval_ms, 250);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        match SettingsFile::new(&path).load() {
            Err(SettingsError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
