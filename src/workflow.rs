//! The create-and-upload sequence.
//!
//! 1. Check the board and read the partition layout.
//! 2. Locate `mklittlefs` (required), the uploader script (optional) and a
//!    Python interpreter.
//! 3. Make sure `<sketch>/data` exists and count what is in it. An empty
//!    folder needs explicit confirmation.
//! 4. Build the image, then hand it to the uploader on a background thread.
//!
//! Any failure stops the sequence, is reported once through the host's
//! error channel, and is returned to the caller.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use walkdir::WalkDir;

use crate::config::{self, FsLayout, Preferences};
use crate::error::FsError;
use crate::host::{Host, StatusReporter};
use crate::image;
use crate::locate;
use crate::upload::{self, UploadRequest};

/// Name of the sketch subfolder that becomes the filesystem.
pub const DATA_DIR: &str = "data";

pub const EMPTY_DATA_PROMPT: &str = "No files have been found in your data folder!\n\
                                     Are you sure you want to create an empty LittleFS image?";

/// Per-invocation options that do not come from board preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Folder the image is written to.
    pub build_dir: PathBuf,
    /// Stop after the image is built.
    pub build_only: bool,
}

/// Resolved paths for one run. Computed once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    pub data_dir: PathBuf,
    pub image: PathBuf,
    pub packer: PathBuf,
    pub interpreter: PathBuf,
    pub uploader: Option<PathBuf>,
}

/// How a successful run ended.
#[derive(Debug)]
pub enum Outcome {
    /// Image built; upload was not requested.
    Built { image: PathBuf },
    /// Image built; the platform has no uploader script.
    UploadSkipped { image: PathBuf },
    /// Image built and the upload is running. Join to wait for it.
    Uploading(JoinHandle<Result<(), FsError>>),
}

impl Outcome {
    /// Block until any in-flight upload finishes.
    pub fn wait(self) -> Result<(), FsError> {
        match self {
            Outcome::Built { .. } | Outcome::UploadSkipped { .. } => Ok(()),
            Outcome::Uploading(handle) => handle.join().unwrap_or_else(|_| {
                Err(FsError::UploadFailed {
                    code: None,
                    detail: "upload thread panicked".to_string(),
                })
            }),
        }
    }
}

/// Run the whole sequence.
///
/// `H` may be unsized, so a host held as `Arc<dyn Host>` works as well as a
/// concrete one.
pub fn create_and_upload<H>(
    host: Arc<H>,
    prefs: &impl Preferences,
    options: &RunOptions,
) -> Result<Outcome, FsError>
where
    H: Host + ?Sized + 'static,
{
    let result = run(&host, prefs, options);
    if let Err(e) = &result {
        tracing::debug!(error = ?e, "create-and-upload aborted");
        host.error(&e.to_string());
    }
    result
}

fn run<H>(host: &Arc<H>, prefs: &impl Preferences, options: &RunOptions) -> Result<Outcome, FsError>
where
    H: Host + ?Sized + 'static,
{
    let layout = config::resolve_layout(prefs)?;
    let packer = locate::locate_packer(prefs)?;

    let serial_port = if options.build_only {
        None
    } else {
        Some(config::serial_port(prefs)?)
    };

    let uploader = locate::locate_uploader(prefs);
    let interpreter = locate::locate_interpreter(prefs);

    let data_dir = ensure_data_dir(host.sketch_folder())?;
    let file_count = count_data_entries(&data_dir);
    tracing::debug!(data = %data_dir.display(), file_count, "scanned data folder");

    let paths = BuildPaths {
        image: image::image_path(&options.build_dir, host.sketch_name()),
        data_dir,
        packer,
        interpreter,
        uploader,
    };

    if file_count == 0 && !host.confirm(EMPTY_DATA_PROMPT) {
        return Err(FsError::UserCancelled);
    }

    host.notice("LittleFS Creating Image...");
    image::build_image(&paths.packer, &paths.data_dir, &layout, &paths.image)?;

    let Some(serial_port) = serial_port else {
        host.notice("LittleFS Image Created");
        return Ok(Outcome::Built { image: paths.image });
    };

    host.notice("LittleFS Uploading Image...");
    start_upload(host, &layout, &paths, serial_port)
}

fn start_upload<H>(
    host: &Arc<H>,
    layout: &FsLayout,
    paths: &BuildPaths,
    serial_port: String,
) -> Result<Outcome, FsError>
where
    H: Host + ?Sized + 'static,
{
    let Some(script) = paths.uploader.clone() else {
        tracing::warn!(image = %paths.image.display(), "upload skipped");
        host.notice(&format!(
            "LittleFS Image Created; upload skipped, {} not found",
            locate::UPLOADER_SCRIPT
        ));
        return Ok(Outcome::UploadSkipped {
            image: paths.image.clone(),
        });
    };

    let request = UploadRequest {
        interpreter: paths.interpreter.clone(),
        script,
        base: layout.start(),
        serial_port,
        image: paths.image.clone(),
    };
    request.print_summary();

    let reporter: Arc<dyn StatusReporter> = Arc::new(HostStatus(Arc::clone(host)));
    let handle = upload::spawn_upload(request, reporter, |outcome| {
        tracing::debug!(ok = outcome.is_ok(), "upload finished");
    });
    Ok(Outcome::Uploading(handle))
}

/// Status half of a host, handed to the upload thread.
struct HostStatus<H: ?Sized>(Arc<H>);

impl<H: Host + ?Sized> StatusReporter for HostStatus<H> {
    fn notice(&self, text: &str) {
        self.0.notice(text);
    }

    fn error(&self, text: &str) {
        self.0.error(text);
    }
}

/// `<sketch>/data`, created if missing.
pub fn ensure_data_dir(sketch_folder: &Path) -> Result<PathBuf, FsError> {
    let data_dir = sketch_folder.join(DATA_DIR);
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir).map_err(|e| {
            FsError::io(
                format!("creating data folder '{}'", data_dir.display()),
                e,
            )
        })?;
    }
    Ok(data_dir)
}

/// Count top-level files and folders, ignoring dot-entries.
pub fn count_data_entries(data_dir: &Path) -> usize {
    WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            let kind = entry.file_type();
            (kind.is_file() || kind.is_dir())
                && !entry.file_name().to_string_lossy().starts_with('.')
        })
        .count()
}
