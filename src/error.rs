//! Error kinds surfaced by the create-and-upload workflow.
//!
//! Every variant is terminal for the current operation. The `Display` text is
//! what ends up on the host's status line, so it is kept short and human.

use std::path::PathBuf;

use thiserror::Error;

/// Problems with board/platform preferences.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `target_platform` is missing or not an RP2040 platform.
    #[error("LittleFS Not Supported on {platform}")]
    UnsupportedPlatform {
        /// Platform name as read from preferences (empty if unset).
        platform: String,
    },

    /// The board does not declare a filesystem partition.
    #[error("LittleFS Not Defined for {board}")]
    NotDefined {
        /// Board `name` preference (empty if unset).
        board: String,
    },

    /// A numeric preference could not be parsed.
    #[error("invalid value '{value}' for '{key}'")]
    Malformed {
        /// Preference key.
        key: String,
        /// Raw value as found.
        value: String,
    },

    /// `serial.port` is unset or empty.
    #[error("LittleFS Error: serial port not defined!")]
    MissingSerialPort,
}

/// Errors produced by the packing and upload workflow.
#[derive(Debug, Error)]
pub enum FsError {
    /// Missing or invalid preference.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A required helper executable could not be found.
    #[error("LittleFS Error: {tool} not found!")]
    ToolNotFound {
        /// Executable name that was searched for.
        tool: String,
        /// Directories that were checked, in order.
        searched: Vec<PathBuf>,
    },

    /// The packer ran but exited non-zero, or could not be started.
    #[error("LittleFS Create Failed!")]
    BuildFailed {
        /// Exit code, if the process ran at all.
        code: Option<i32>,
        /// Underlying reason (spawn error or captured stderr).
        detail: String,
    },

    /// The uploader exited non-zero, or could not be started.
    #[error("LittleFS Upload failed! Did you close the Serial Monitor?")]
    UploadFailed {
        /// Exit code, if the process ran at all.
        code: Option<i32>,
        /// Underlying reason (spawn error or captured stderr).
        detail: String,
    },

    /// The user declined to create an empty image.
    #[error("LittleFS Warning: mklittlefs canceled!")]
    UserCancelled,

    /// Filesystem access around the sketch or build folder failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code the CLI should use for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UserCancelled => 2,
            _ => 1,
        }
    }
}
