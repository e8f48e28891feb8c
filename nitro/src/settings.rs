//! Persistent converter settings, stored as JSON under the user's home.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::convert::DEFAULT_DEPTH;
use crate::error::NitroResult;

const SETTINGS_DIR: &str = ".nitro";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Depth given to logic dimensions without a `z`.
    pub default_z: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_z: DEFAULT_DEPTH,
        }
    }
}

impl Settings {
    /// `$HOME/.nitro/settings.json`, or under `%USERPROFILE%` on Windows.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .or_else(|| std::env::var_os("USERPROFILE").filter(|h| !h.is_empty()))?;
        Some(PathBuf::from(home).join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    /// Read settings, falling back to defaults when the file is missing or
    /// unreadable.
    pub fn load(path: &Path) -> Self {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "cannot read settings, using defaults"
                    );
                }
                return Self::default();
            }
        };
        match serde_json::from_slice(&data) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid settings file, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> NitroResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("nope.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.default_z, 1.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings { default_z: 2.5 };
        settings.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"defaultZ\": 2.5"));
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }
}
