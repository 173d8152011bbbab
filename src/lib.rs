//! Pack a sketch's `data` folder into a LittleFS image and upload it to an
//! RP2040 board.
//!
//! The heavy lifting is done by tools the board toolchain already installs:
//! `mklittlefs` builds the image and `uf2conv.py` sends it over serial. This
//! crate finds those tools, runs them with the right arguments, and reports
//! progress through a host-provided status channel.
//!
//! - **Config** - Board preferences, partition layout, TOML settings
//! - **Locate** - Tool search across platform and package folders
//! - **Process** - Subprocess runner that drains stdout/stderr concurrently
//! - **Image / Upload** - The two tool invocations
//! - **Workflow** - The create-and-upload sequence over a [`Host`]
//!
//! # Architecture
//!
//! ```text
//! Host (IDE, CLI, tests)
//!     │ notice / error / confirm / sketch folder
//!     ▼
//! workflow::create_and_upload
//!     ├── config::resolve_layout      (Preferences)
//!     ├── locate::locate_*            (candidate folders)
//!     ├── image::build_image ──────── mklittlefs   (blocking)
//!     └── upload::spawn_upload ────── uf2conv.py   (background thread)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use picofs_upload::{create_and_upload, BoardConfig, ConfirmPolicy, ConsoleHost, RunOptions};
//!
//! let prefs = BoardConfig::load("prefs.txt".as_ref())?;
//! let host = Arc::new(ConsoleHost::new("blink".into(), "blink".into(), ConfirmPolicy::Interactive));
//! let options = RunOptions { build_dir: "blink/build".into(), build_only: false };
//! create_and_upload(host, &prefs, &options)?.wait()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod image;
pub mod locate;
pub mod process;
pub mod upload;
pub mod workflow;

pub use config::{BoardConfig, FsLayout, Preferences};
pub use error::{ConfigError, FsError};
pub use host::{ConfirmPolicy, ConsoleHost, Host, StatusReporter};
pub use workflow::{create_and_upload, BuildPaths, Outcome, RunOptions};
