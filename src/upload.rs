//! Image upload via the platform's `uf2conv.py`.
//!
//! The upload runs on its own thread so the caller stays responsive. The
//! outcome is reported to the status channel and handed to a completion
//! callback once the uploader exits. Nothing is retried; a busy serial port
//! (typically an open serial monitor) needs the user to try again.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::FsError;
use crate::host::StatusReporter;
use crate::process::Cmd;

/// UF2 family identifier passed to the uploader.
pub const FAMILY: &str = "RP2040";

/// Everything the uploader needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub interpreter: PathBuf,
    pub script: PathBuf,
    /// Flash address the image is written to.
    pub base: u64,
    pub serial_port: String,
    pub image: PathBuf,
}

impl UploadRequest {
    /// Assemble the uploader command line.
    pub fn command(&self) -> Cmd {
        Cmd::new(&self.interpreter)
            .arg_path(&self.script)
            .args(["--base", &self.base.to_string()])
            .args(["--serial", &self.serial_port])
            .args(["--family", FAMILY])
            .arg_path(&self.image)
    }

    /// Print the upload parameters to the console.
    pub fn print_summary(&self) {
        println!("[LittleFS] upload   : {}", self.image.display());
        println!("[LittleFS] address  : {}", self.base);
        println!("[LittleFS] serial   : {}", self.serial_port);
        println!("[LittleFS] python   : {}", self.interpreter.display());
        println!("[LittleFS] uploader : {}", self.script.display());
        println!();
    }
}

/// Run the uploader and wait for it, on the calling thread.
pub fn run_upload(request: &UploadRequest) -> Result<(), FsError> {
    let cmd = request.command();
    tracing::info!(command = %cmd.display(), "uploading image");

    let result = cmd.run().map_err(|e| FsError::UploadFailed {
        code: None,
        detail: format!("{e:#}"),
    })?;

    if result.success() {
        Ok(())
    } else {
        Err(FsError::UploadFailed {
            code: result.code,
            detail: result.stderr.trim().to_string(),
        })
    }
}

/// Start the upload on a background thread.
///
/// When the uploader exits, the outcome is reported through `reporter` and
/// then passed to `on_complete`. The returned handle yields the same outcome
/// for callers that want to wait.
pub fn spawn_upload<F>(
    request: UploadRequest,
    reporter: Arc<dyn StatusReporter>,
    on_complete: F,
) -> JoinHandle<Result<(), FsError>>
where
    F: FnOnce(&Result<(), FsError>) + Send + 'static,
{
    thread::spawn(move || {
        let outcome = run_upload(&request);
        match &outcome {
            Ok(()) => reporter.notice("LittleFS Image Uploaded"),
            Err(e) => reporter.error(&e.to_string()),
        }
        on_complete(&outcome);
        outcome
    })
}
