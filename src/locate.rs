//! Locating the helper tools installed by the board toolchain.
//!
//! Candidate directories are searched in order and the first hit wins.
//! Where each tool is looked for mirrors the layout of the RP2040 Arduino
//! core: bundled binaries under `<platform>/system`, scripts under
//! `<platform>/tools`, and separately installed packages recorded as
//! `runtime.tools.<package>.path` preferences.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{self, Preferences, KEY_PLATFORM_PATH};
use crate::error::FsError;

pub const PACKER: &str = "mklittlefs";
pub const INTERPRETER: &str = "python3";
pub const UPLOADER_SCRIPT: &str = "uf2conv.py";

const PACKER_TOOL_PACKAGE: &str = "pqt-mklittlefs";
const PYTHON_TOOL_PACKAGE: &str = "pqt-python3";

/// Find the first executable file called `name` in `candidates`.
pub fn find_tool(candidates: &[PathBuf], name: &str) -> Result<PathBuf, FsError> {
    find_in(candidates, name, true)
}

/// Find the first regular file called `name` in `candidates`.
///
/// Like [`find_tool`] but without the execute-permission check, for scripts
/// that are run through an interpreter.
pub fn find_file(candidates: &[PathBuf], name: &str) -> Result<PathBuf, FsError> {
    find_in(candidates, name, false)
}

fn find_in(candidates: &[PathBuf], name: &str, executable: bool) -> Result<PathBuf, FsError> {
    for dir in candidates {
        let candidate = dir.join(name);
        let found = candidate.is_file() && (!executable || is_executable(&candidate));
        tracing::debug!(path = %candidate.display(), found, "tool candidate");
        if found {
            return Ok(candidate);
        }
    }
    Err(FsError::ToolNotFound {
        tool: name.to_string(),
        searched: candidates.to_vec(),
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

fn platform_dir(prefs: &impl Preferences) -> Option<PathBuf> {
    prefs
        .get(KEY_PLATFORM_PATH)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

fn tool_package_dir(prefs: &impl Preferences, package: &str) -> Option<PathBuf> {
    prefs
        .tool_path(package)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

/// Search order for `mklittlefs`.
pub fn packer_candidates(prefs: &impl Preferences) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(platform) = platform_dir(prefs) {
        dirs.push(platform.join("system"));
        dirs.push(platform.join("system").join("mklittlefs"));
    }
    dirs.extend(tool_package_dir(prefs, PACKER_TOOL_PACKAGE));
    dirs
}

/// Search order for `python3`.
pub fn interpreter_candidates(prefs: &impl Preferences) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(platform) = platform_dir(prefs) {
        dirs.push(platform.join("system"));
        dirs.push(platform.join("system").join("python3"));
    }
    dirs.extend(tool_package_dir(prefs, PYTHON_TOOL_PACKAGE));
    dirs
}

/// Search order for `uf2conv.py`.
pub fn uploader_candidates(prefs: &impl Preferences) -> Vec<PathBuf> {
    platform_dir(prefs)
        .map(|platform| vec![platform.join("tools")])
        .unwrap_or_default()
}

/// Locate the packer executable. Missing packer is fatal.
pub fn locate_packer(prefs: &impl Preferences) -> Result<PathBuf, FsError> {
    find_tool(&packer_candidates(prefs), &config::exe_name(prefs, PACKER))
}

/// Locate the uploader script, if the platform ships one.
pub fn locate_uploader(prefs: &impl Preferences) -> Option<PathBuf> {
    find_file(&uploader_candidates(prefs), UPLOADER_SCRIPT).ok()
}

/// Locate a Python interpreter.
///
/// Prefers one bundled with the toolchain, then `PATH`. If neither exists
/// the bare command name is returned and spawning it reports the failure.
pub fn locate_interpreter(prefs: &impl Preferences) -> PathBuf {
    let name = config::exe_name(prefs, INTERPRETER);
    if let Ok(path) = find_tool(&interpreter_candidates(prefs), &name) {
        return path;
    }
    which::which(&name).unwrap_or_else(|_| PathBuf::from(name))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use std::os::unix::fs::PermissionsExt;

    fn write_exe(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_first_candidate_in_order_wins() {
        let temp = tempfile::TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        let c = temp.path().join("c");
        write_exe(&b.join("mklittlefs"));
        write_exe(&c.join("mklittlefs"));

        let found = find_tool(&[a, b.clone(), c], "mklittlefs").unwrap();
        assert_eq!(found, b.join("mklittlefs"));
    }

    #[test]
    fn test_not_found_on_empty_or_missing() {
        assert!(matches!(
            find_tool(&[], "mklittlefs"),
            Err(FsError::ToolNotFound { ref tool, ref searched }) if tool == "mklittlefs" && searched.is_empty()
        ));

        let temp = tempfile::TempDir::new().unwrap();
        let err = find_tool(&[temp.path().to_path_buf()], "mklittlefs").unwrap_err();
        assert!(matches!(err, FsError::ToolNotFound { searched, .. } if searched.len() == 1));
    }

    #[test]
    fn test_directory_or_non_executable_skipped() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir_hit = temp.path().join("one");
        fs::create_dir_all(dir_hit.join("mklittlefs")).unwrap();
        let plain = temp.path().join("two");
        fs::create_dir_all(&plain).unwrap();
        fs::write(plain.join("mklittlefs"), "").unwrap();
        fs::set_permissions(plain.join("mklittlefs"), fs::Permissions::from_mode(0o644)).unwrap();

        let candidates = [dir_hit, plain.clone()];
        assert!(find_tool(&candidates, "mklittlefs").is_err());
        // Scripts only need to exist.
        assert_eq!(
            find_file(&candidates, "mklittlefs").unwrap(),
            plain.join("mklittlefs")
        );
    }

    #[test]
    fn test_packer_search_order_from_preferences() {
        let temp = tempfile::TempDir::new().unwrap();
        let platform = temp.path().join("platform");
        let pkg = temp.path().join("pkg");
        write_exe(&pkg.join("mklittlefs"));
        let prefs = BoardConfig::from_pairs([
            (KEY_PLATFORM_PATH, platform.to_str().unwrap()),
            (
                "runtime.tools.pqt-mklittlefs.path",
                pkg.to_str().unwrap(),
            ),
        ]);

        assert_eq!(
            packer_candidates(&prefs),
            vec![
                platform.join("system"),
                platform.join("system/mklittlefs"),
                pkg.clone()
            ]
        );
        assert_eq!(locate_packer(&prefs).unwrap(), pkg.join("mklittlefs"));

        write_exe(&platform.join("system/mklittlefs/mklittlefs"));
        assert_eq!(
            locate_packer(&prefs).unwrap(),
            platform.join("system/mklittlefs/mklittlefs")
        );
    }

    #[test]
    fn test_windows_executable_names() {
        let temp = tempfile::TempDir::new().unwrap();
        write_exe(&temp.path().join("system/mklittlefs.exe"));
        let prefs = BoardConfig::from_pairs([
            (KEY_PLATFORM_PATH, temp.path().to_str().unwrap()),
            ("runtime.os", "windows"),
        ]);
        assert_eq!(
            locate_packer(&prefs).unwrap(),
            temp.path().join("system/mklittlefs.exe")
        );
    }

    #[test]
    fn test_uploader_optional() {
        let temp = tempfile::TempDir::new().unwrap();
        let prefs = BoardConfig::from_pairs([(KEY_PLATFORM_PATH, temp.path().to_str().unwrap())]);
        assert_eq!(locate_uploader(&prefs), None);

        fs::create_dir_all(temp.path().join("tools")).unwrap();
        fs::write(temp.path().join("tools/uf2conv.py"), "").unwrap();
        assert_eq!(
            locate_uploader(&prefs),
            Some(temp.path().join("tools/uf2conv.py"))
        );
        assert!(locate_uploader(&BoardConfig::default()).is_none());
    }

    #[test]
    fn test_bundled_interpreter_preferred() {
        let temp = tempfile::TempDir::new().unwrap();
        write_exe(&temp.path().join("system/python3/python3"));
        let prefs = BoardConfig::from_pairs([(KEY_PLATFORM_PATH, temp.path().to_str().unwrap())]);
        assert_eq!(
            locate_interpreter(&prefs),
            temp.path().join("system/python3/python3")
        );
    }

    #[test]
    fn test_interpreter_falls_back_to_bare_name() {
        let prefs = BoardConfig::from_pairs([("runtime.os", "windows")]);
        let found = locate_interpreter(&prefs);
        // No python3.exe on a unix PATH.
        assert_eq!(found, PathBuf::from("python3.exe"));
    }
}
