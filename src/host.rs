//! The capabilities the workflow needs from whatever is driving it.
//!
//! An IDE, the bundled CLI, and tests all implement [`Host`]. The workflow
//! never talks to a UI directly.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Where status messages go.
pub trait StatusReporter: Send + Sync {
    fn notice(&self, text: &str);
    fn error(&self, text: &str);
}

/// Sketch access, status output, and the empty-image confirmation.
pub trait Host: StatusReporter {
    /// Folder containing the sketch (and its `data` subfolder).
    fn sketch_folder(&self) -> &Path;

    /// Sketch name, used for the image file name.
    fn sketch_name(&self) -> &str;

    /// Ask a yes/no question. `false` means declined.
    fn confirm(&self, message: &str) -> bool;
}

/// How confirmation questions are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPolicy {
    AssumeYes,
    AssumeNo,
    /// Prompt on the terminal, defaulting to "no".
    Interactive,
}

impl ConfirmPolicy {
    pub fn confirm(self, message: &str) -> bool {
        match self {
            Self::AssumeYes => true,
            Self::AssumeNo => false,
            Self::Interactive => dialoguer::Confirm::new()
                .with_prompt(message)
                .default(false)
                .interact()
                .unwrap_or(false),
        }
    }
}

/// Host for terminal use: status goes to the log, confirmation per policy.
pub struct ConsoleHost {
    sketch_folder: PathBuf,
    sketch_name: String,
    policy: ConfirmPolicy,
}

impl ConsoleHost {
    pub fn new(sketch_folder: PathBuf, sketch_name: String, policy: ConfirmPolicy) -> Self {
        Self {
            sketch_folder,
            sketch_name,
            policy,
        }
    }
}

impl StatusReporter for ConsoleHost {
    fn notice(&self, text: &str) {
        tracing::info!("{text}");
    }

    fn error(&self, text: &str) {
        tracing::error!("{text}");
    }
}

impl Host for ConsoleHost {
    fn sketch_folder(&self) -> &Path {
        &self.sketch_folder
    }

    fn sketch_name(&self) -> &str {
        &self.sketch_name
    }

    fn confirm(&self, message: &str) -> bool {
        self.policy.confirm(message)
    }
}

/// A single recorded status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Notice(String),
    Error(String),
}

/// Reporter that keeps every message, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StatusLog {
    entries: Arc<Mutex<Vec<Status>>>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Status> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    fn push(&self, status: Status) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(status);
        }
    }
}

impl StatusReporter for StatusLog {
    fn notice(&self, text: &str) {
        self.push(Status::Notice(text.to_string()));
    }

    fn error(&self, text: &str) {
        self.push(Status::Error(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policies() {
        assert!(ConfirmPolicy::AssumeYes.confirm("proceed?"));
        assert!(!ConfirmPolicy::AssumeNo.confirm("proceed?"));
    }

    #[test]
    fn test_status_log_keeps_order_across_clones() {
        let log = StatusLog::new();
        let shared = log.clone();
        log.notice("creating");
        shared.error("failed");
        assert_eq!(
            log.entries(),
            vec![
                Status::Notice("creating".into()),
                Status::Error("failed".into())
            ]
        );
    }

    #[test]
    fn test_console_host_accessors() {
        let host = ConsoleHost::new(
            PathBuf::from("/sketches/blink"),
            "blink".into(),
            ConfirmPolicy::AssumeNo,
        );
        assert_eq!(host.sketch_folder(), Path::new("/sketches/blink"));
        assert_eq!(host.sketch_name(), "blink");
        assert!(!host.confirm("empty image?"));
    }
}
