//! Optional TOML settings file for the command-line tool.
//!
//! ```toml
//! build_dir = "build"
//! assume_yes = false
//!
//! [preferences]
//! "serial.port" = "/dev/ttyACM0"
//! "runtime.platform.path" = "/home/me/.arduino15/packages/rp2040/hardware/rp2040/3.9.0"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::BoardConfig;

/// File name looked up in the sketch folder.
pub const SKETCH_SETTINGS_FILE: &str = "picofs.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Build output folder; relative paths are resolved against the sketch.
    pub build_dir: Option<PathBuf>,
    pub assume_yes: bool,
    pub preferences: BoardConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    build_dir: Option<String>,
    assume_yes: Option<bool>,
    preferences: Option<BTreeMap<String, String>>,
}

/// Parse settings from TOML text. `origin` is only used in error messages.
pub fn parse_settings(text: &str, origin: &Path) -> Result<Settings> {
    let parsed: SettingsToml = toml::from_str(text)
        .with_context(|| format!("parsing settings '{}'", origin.display()))?;

    let build_dir = parsed
        .build_dir
        .map(|dir| dir.trim().to_string())
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);

    Ok(Settings {
        build_dir,
        assume_yes: parsed.assume_yes.unwrap_or(false),
        preferences: BoardConfig::from_pairs(parsed.preferences.unwrap_or_default()),
    })
}

/// Read a settings file.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading settings '{}'", path.display()))?;
    parse_settings(&text, path)
}

/// Default settings location: `<sketch>/picofs.toml`, then the user config dir.
///
/// Returns `None` when neither file exists.
pub fn default_settings_path(sketch: &Path) -> Option<PathBuf> {
    let local = sketch.join(SKETCH_SETTINGS_FILE);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("picofs-upload").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preferences;

    #[test]
    fn test_parse_full_settings() {
        let settings = parse_settings(
            r#"
build_dir = "out"
assume_yes = true

[preferences]
"serial.port" = "/dev/ttyACM0"
target_platform = "rp2040"
"#,
            Path::new("picofs.toml"),
        )
        .unwrap();
        assert_eq!(settings.build_dir, Some(PathBuf::from("out")));
        assert!(settings.assume_yes);
        assert_eq!(settings.preferences.get("serial.port"), Some("/dev/ttyACM0"));
        assert_eq!(settings.preferences.get("target_platform"), Some("rp2040"));
    }

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = parse_settings("", Path::new("picofs.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse_settings("build_folder = \"x\"\n", Path::new("picofs.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("picofs.toml"));
    }

    #[test]
    fn test_sketch_local_settings_found() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::write(temp.path().join(SKETCH_SETTINGS_FILE), "assume_yes = true\n").unwrap();

        let path = default_settings_path(temp.path()).unwrap();
        assert_eq!(path, temp.path().join(SKETCH_SETTINGS_FILE));
        assert!(load_settings(&path).unwrap().assume_yes);
    }
}
