//! LittleFS image creation via `mklittlefs`.
//!
//! `mklittlefs` takes the source folder, page size, block size and total
//! partition size, and writes the image as its last positional argument:
//!
//! ```text
//! mklittlefs -c <data> -p <page> -b <block> -s <size> <image>
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::FsLayout;
use crate::error::FsError;
use crate::process::Cmd;

/// File name of the image built for `sketch_name`.
pub fn image_name(sketch_name: &str) -> String {
    format!("{sketch_name}.mklittlefs.bin")
}

/// Path of the image for `sketch_name` inside `build_dir`.
pub fn image_path(build_dir: &Path, sketch_name: &str) -> PathBuf {
    build_dir.join(image_name(sketch_name))
}

/// Assemble the `mklittlefs` command line.
pub fn packer_command(packer: &Path, data_dir: &Path, layout: &FsLayout, image: &Path) -> Cmd {
    Cmd::new(packer)
        .arg("-c")
        .arg_path(data_dir)
        .args(["-p", &layout.page().to_string()])
        .args(["-b", &layout.block().to_string()])
        .args(["-s", &layout.size().to_string()])
        .arg_path(image)
}

/// Build the filesystem image, blocking until `mklittlefs` exits.
///
/// The image is only valid if this returns `Ok`.
pub fn build_image(
    packer: &Path,
    data_dir: &Path,
    layout: &FsLayout,
    image: &Path,
) -> Result<(), FsError> {
    if let Some(parent) = image.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            FsError::io(
                format!("creating build directory '{}'", parent.display()),
                e,
            )
        })?;
    }

    println!("[LittleFS] data    : {}", data_dir.display());
    println!("[LittleFS] size    : {}KB", layout.size_kb());
    println!("[LittleFS] page    : {}", layout.page());
    println!("[LittleFS] block   : {}", layout.block());

    let cmd = packer_command(packer, data_dir, layout, image);
    tracing::info!(command = %cmd.display(), "creating image");

    let result = cmd.run().map_err(|e| FsError::BuildFailed {
        code: None,
        detail: format!("{e:#}"),
    })?;

    if !result.success() {
        eprintln!();
        return Err(FsError::BuildFailed {
            code: result.code,
            detail: result.stderr.trim().to_string(),
        });
    }

    Ok(())
}
