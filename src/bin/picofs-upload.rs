//! Build a LittleFS image from a sketch's data folder and upload it.
//!
//! Usage:
//!   picofs-upload --prefs ~/.arduino15/preferences.txt --port /dev/ttyACM0
//!   picofs-upload --sketch blink --set build.fs_start=0x10100000 --build-only

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use picofs_upload::config::settings::{default_settings_path, load_settings, Settings};
use picofs_upload::config::{parse_assignment, KEY_PLATFORM_PATH, KEY_SERIAL_PORT};
use picofs_upload::{create_and_upload, BoardConfig, ConfirmPolicy, ConsoleHost, RunOptions};

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "picofs-upload")]
#[command(about = "Pack a sketch's data folder into a LittleFS image and upload it to an RP2040")]
struct Cli {
    /// Sketch folder (contains the `data` subfolder)
    #[arg(long, default_value = ".")]
    sketch: PathBuf,

    /// Sketch name used for the image file (default: sketch folder name)
    #[arg(long)]
    sketch_name: Option<String>,

    /// Preferences file in key=value format; repeat to layer, later wins
    #[arg(long = "prefs", value_name = "FILE")]
    prefs: Vec<PathBuf>,

    /// Set a single preference; overrides everything else
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Serial port (shorthand for --set serial.port=...)
    #[arg(short, long)]
    port: Option<String>,

    /// Board platform folder (shorthand for --set runtime.platform.path=...)
    #[arg(long, value_name = "DIR")]
    platform_path: Option<PathBuf>,

    /// Folder the image is written to (default: <sketch>/build)
    #[arg(long, value_name = "DIR")]
    build_dir: Option<PathBuf>,

    /// TOML settings file (default: <sketch>/picofs.toml, then user config)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Create an empty image without asking
    #[arg(short = 'y', long, conflicts_with = "no_confirm")]
    yes: bool,

    /// Never create an empty image; decline without asking
    #[arg(long)]
    no_confirm: bool,

    /// Build the image but do not upload it
    #[arg(long)]
    build_only: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = match cli.config.clone().or_else(|| default_settings_path(&cli.sketch)) {
        Some(path) => load_settings(&path)?,
        None => Settings::default(),
    };

    let prefs = collect_preferences(&cli, &settings)?;
    let sketch = sketch_folder(&cli.sketch)?;
    let sketch_name = match cli.sketch_name.clone() {
        Some(name) => name,
        None => sketch
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("cannot derive a sketch name; pass --sketch-name")?,
    };

    let policy = confirm_policy(&cli, &settings);

    let options = RunOptions {
        build_dir: build_dir(&cli, &settings, &sketch),
        build_only: cli.build_only,
    };

    let host = Arc::new(ConsoleHost::new(sketch, sketch_name, policy));

    // Failures have already been reported through the host.
    match create_and_upload(host, &prefs, &options).and_then(|outcome| outcome.wait()) {
        Ok(()) => Ok(()),
        Err(e) => std::process::exit(e.exit_code()),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Layer preference sources: settings < --prefs files < shorthands < --set.
fn collect_preferences(cli: &Cli, settings: &Settings) -> Result<BoardConfig> {
    let mut prefs = settings.preferences.clone();

    for path in &cli.prefs {
        prefs.merge(BoardConfig::load(path)?);
    }

    if let Some(port) = &cli.port {
        prefs.extend([(KEY_SERIAL_PORT, port.as_str())]);
    }
    if let Some(platform) = &cli.platform_path {
        prefs.extend([(KEY_PLATFORM_PATH.to_string(), platform.display().to_string())]);
    }

    for raw in &cli.set {
        let (key, value) = parse_assignment(raw).context("parsing --set")?;
        prefs.extend([(key, value)]);
    }

    tracing::debug!(count = prefs.len(), "preferences loaded");
    Ok(prefs)
}

/// Flags win over the settings file; with neither, ask.
fn confirm_policy(cli: &Cli, settings: &Settings) -> ConfirmPolicy {
    if cli.yes {
        ConfirmPolicy::AssumeYes
    } else if cli.no_confirm {
        ConfirmPolicy::AssumeNo
    } else if settings.assume_yes {
        ConfirmPolicy::AssumeYes
    } else {
        ConfirmPolicy::Interactive
    }
}

fn sketch_folder(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("resolving sketch folder '{}'", path.display()))
}

fn build_dir(cli: &Cli, settings: &Settings, sketch: &Path) -> PathBuf {
    cli.build_dir
        .clone()
        .or_else(|| settings.build_dir.as_ref().map(|dir| sketch.join(dir)))
        .unwrap_or_else(|| sketch.join("build"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use picofs_upload::Preferences;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("picofs-upload").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_preference_precedence() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("prefs.txt");
        std::fs::write(&file, "serial.port=/dev/file\nname=Pico\nruntime.os=linux\n").unwrap();

        let settings = Settings {
            preferences: BoardConfig::from_pairs([("name", "from-settings"), ("serial.port", "/dev/settings")]),
            ..Settings::default()
        };
        let cli = parse(&[
            "--prefs",
            file.to_str().unwrap(),
            "--port",
            "/dev/flag",
            "--set",
            "runtime.os=windows",
        ]);

        let prefs = collect_preferences(&cli, &settings).unwrap();
        assert_eq!(prefs.get("name"), Some("Pico"));
        assert_eq!(prefs.get("serial.port"), Some("/dev/flag"));
        assert_eq!(prefs.get("runtime.os"), Some("windows"));
    }

    #[test]
    fn test_build_dir_resolution() {
        let sketch = Path::new("/sketches/blink");
        let cli = parse(&[]);
        assert_eq!(
            build_dir(&cli, &Settings::default(), sketch),
            PathBuf::from("/sketches/blink/build")
        );

        let settings = Settings {
            build_dir: Some("out".into()),
            ..Settings::default()
        };
        assert_eq!(
            build_dir(&cli, &settings, sketch),
            PathBuf::from("/sketches/blink/out")
        );

        let cli = parse(&["--build-dir", "/tmp/fs"]);
        assert_eq!(build_dir(&cli, &settings, sketch), PathBuf::from("/tmp/fs"));
    }

    #[test]
    fn test_no_confirm_flag_overrides_settings() {
        let settings = Settings {
            assume_yes: true,
            ..Settings::default()
        };
        assert_eq!(
            confirm_policy(&parse(&["--no-confirm"]), &settings),
            ConfirmPolicy::AssumeNo
        );
        assert_eq!(confirm_policy(&parse(&[]), &settings), ConfirmPolicy::AssumeYes);
        assert_eq!(
            confirm_policy(&parse(&["-y"]), &Settings::default()),
            ConfirmPolicy::AssumeYes
        );
        assert_eq!(
            confirm_policy(&parse(&[]), &Settings::default()),
            ConfirmPolicy::Interactive
        );
    }

    #[test]
    fn test_yes_conflicts_with_no_confirm() {
        let result = Cli::try_parse_from(["picofs-upload", "--yes", "--no-confirm"]);
        assert!(result.is_err());
    }
}
