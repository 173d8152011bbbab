//! Board and platform preferences.
//!
//! Preferences are plain `key=value` strings, the same shape the Arduino IDE
//! keeps in `preferences.txt` and `boards.txt`. The workflow only ever reads
//! them through the [`Preferences`] trait so the source can be a file, the
//! command line, or a test fixture.
//!
//! # Example
//!
//! ```rust
//! use picofs_upload::config::{resolve_layout, BoardConfig};
//!
//! let prefs = BoardConfig::from_pairs([
//!     ("target_platform", "rp2040"),
//!     ("build.fs_start", "0x200000"),
//!     ("build.fs_end", "0x300000"),
//! ]);
//! let layout = resolve_layout(&prefs).unwrap();
//! assert_eq!(layout.size(), 1_048_576);
//! ```

pub mod settings;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::ConfigError;

/// Platform name this tool knows how to pack for.
pub const SUPPORTED_PLATFORM: &str = "rp2040";

/// LittleFS page size used by the RP2040 core.
pub const PAGE_SIZE: u64 = 256;

/// LittleFS block size used by the RP2040 core.
pub const BLOCK_SIZE: u64 = 4096;

pub const KEY_TARGET_PLATFORM: &str = "target_platform";
pub const KEY_FS_START: &str = "build.fs_start";
pub const KEY_FS_END: &str = "build.fs_end";
pub const KEY_BOARD_NAME: &str = "name";
pub const KEY_RUNTIME_OS: &str = "runtime.os";
pub const KEY_SERIAL_PORT: &str = "serial.port";
pub const KEY_PLATFORM_PATH: &str = "runtime.platform.path";

/// Read-only key/value lookup.
pub trait Preferences {
    /// Value for `key`, if set.
    fn get(&self, key: &str) -> Option<&str>;

    /// Value for `key`, or the empty string.
    fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Installation path of a toolchain package (`runtime.tools.<tool>.path`).
    fn tool_path(&self, tool: &str) -> Option<&str> {
        self.get(&format!("runtime.tools.{tool}.path"))
    }
}

/// Immutable snapshot of board and platform preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardConfig {
    values: BTreeMap<String, String>,
}

impl BoardConfig {
    /// Build from explicit pairs. Later pairs override earlier ones.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut config = Self::default();
        config.extend(pairs);
        config
    }

    /// Parse `key=value` lines.
    ///
    /// Blank lines and lines starting with `#` are skipped. The first `=`
    /// splits key from value; both are trimmed. Lines without `=` are ignored.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        config.merge_text(text);
        config
    }

    /// Read a `key=value` file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading preferences '{}'", path.display()))?;
        Ok(Self::parse(&text))
    }

    /// Merge `key=value` lines over the current values.
    pub fn merge_text(&mut self, text: &str) {
        for line in text.lines() {
            if let Some((key, value)) = parse_line(line) {
                self.values.insert(key.to_string(), value.to_string());
            }
        }
    }

    /// Merge another snapshot over this one.
    pub fn merge(&mut self, other: BoardConfig) {
        self.values.extend(other.values);
    }

    /// Insert pairs, overriding existing keys.
    pub fn extend<K, V, I>(&mut self, pairs: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in pairs {
            self.values.insert(key.into(), value.into());
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Preferences for BoardConfig {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Split a `KEY=VALUE` assignment, as given on the command line.
pub fn parse_assignment(raw: &str) -> Result<(String, String)> {
    parse_line(raw)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| anyhow::anyhow!("expected KEY=VALUE, got '{}'", raw))
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// Parse an integer preference.
///
/// An empty value reads as 0. A `0x` prefix selects base 16, anything else
/// is decimal.
pub fn parse_int(key: &str, value: &str) -> Result<u64, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| ConfigError::Malformed {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Flash layout of the filesystem partition.
///
/// Always satisfies `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsLayout {
    start: u64,
    end: u64,
    page: u64,
    block: u64,
}

impl FsLayout {
    /// Layout with the RP2040 page and block sizes, or `None` if `end < start`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (end >= start).then_some(Self {
            start,
            end,
            page: PAGE_SIZE,
            block: BLOCK_SIZE,
        })
    }

    /// Start offset of the partition.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// End offset of the partition (exclusive).
    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn block(&self) -> u64 {
        self.block
    }

    /// Partition size in bytes.
    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    /// Partition size in KiB, rounded down.
    pub fn size_kb(&self) -> u64 {
        self.size() / 1024
    }
}

/// Check the target platform and read the partition bounds.
pub fn resolve_layout(prefs: &impl Preferences) -> Result<FsLayout, ConfigError> {
    let platform = prefs.get_or_empty(KEY_TARGET_PLATFORM);
    if platform != SUPPORTED_PLATFORM {
        return Err(ConfigError::UnsupportedPlatform {
            platform: platform.to_string(),
        });
    }

    let (Some(start), Some(end)) = (prefs.get(KEY_FS_START), prefs.get(KEY_FS_END)) else {
        return Err(ConfigError::NotDefined {
            board: prefs.get_or_empty(KEY_BOARD_NAME).to_string(),
        });
    };

    let start_value = parse_int(KEY_FS_START, start)?;
    let end_value = parse_int(KEY_FS_END, end)?;
    FsLayout::new(start_value, end_value).ok_or_else(|| ConfigError::Malformed {
        key: KEY_FS_END.to_string(),
        value: end.to_string(),
    })
}

/// True when preferences say the host runs Windows.
pub fn is_windows(prefs: &impl Preferences) -> bool {
    prefs.get_or_empty(KEY_RUNTIME_OS) == "windows"
}

/// Executable file name for `base` on the host OS named by preferences.
pub fn exe_name(prefs: &impl Preferences, base: &str) -> String {
    if is_windows(prefs) {
        format!("{base}.exe")
    } else {
        base.to_string()
    }
}

/// The serial port to upload through.
pub fn serial_port(prefs: &impl Preferences) -> Result<String, ConfigError> {
    match prefs.get(KEY_SERIAL_PORT).map(str::trim) {
        Some(port) if !port.is_empty() => Ok(port.to_string()),
        _ => Err(ConfigError::MissingSerialPort),
    }
}
