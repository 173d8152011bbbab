//! Subprocess execution with concurrent output draining.
//!
//! [`Cmd`] is a small builder around [`std::process::Command`]. Every run
//! pipes both stdout and stderr and reads each on its own thread, so a tool
//! that floods one stream while we wait on the other can never fill a pipe
//! buffer and stall. Output is captured and, unless disabled, echoed to our
//! own console as it arrives.
//!
//! ```rust,no_run
//! use picofs_upload::process::Cmd;
//!
//! let result = Cmd::new("mklittlefs")
//!     .args(["-c", "data"])
//!     .run()?;
//! if !result.success() {
//!     eprintln!("{}", result.stderr);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};

/// Exit status and captured output of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exit code; `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Builder for a single subprocess invocation.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    echo: bool,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            echo: true,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn arg_path(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    /// Capture output without echoing it to the console.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Command line as a single display string.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Spawn, drain both streams, and wait for exit.
    ///
    /// Fails only if the process cannot be started or its output cannot be
    /// read. A non-zero exit is returned in [`ProcessResult`] for the caller
    /// to interpret.
    pub fn run(&self) -> Result<ProcessResult> {
        tracing::debug!(command = %self.display(), "spawning");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start '{}'", self.program.to_string_lossy()))?;

        let stdout = child
            .stdout
            .take()
            .context("child stdout was not captured")?;
        let stderr = child
            .stderr
            .take()
            .context("child stderr was not captured")?;

        let stdout_reader = drain(stdout, self.echo.then_some(Echo::Stdout));
        let stderr_reader = drain(stderr, self.echo.then_some(Echo::Stderr));

        let status = child
            .wait()
            .with_context(|| format!("waiting for '{}'", self.program.to_string_lossy()))?;

        let stdout = join_reader(stdout_reader, "stdout")?;
        let stderr = join_reader(stderr_reader, "stderr")?;

        let result = ProcessResult {
            code: status.code(),
            stdout,
            stderr,
        };
        tracing::debug!(code = ?result.code, "process exited");

        Ok(result)
    }
}

#[derive(Clone, Copy)]
enum Echo {
    Stdout,
    Stderr,
}

impl Echo {
    fn write(self, bytes: &[u8]) {
        // Console echo is best effort; the captured copy is authoritative.
        let _ = match self {
            Echo::Stdout => io::stdout().lock().write_all(bytes),
            Echo::Stderr => io::stderr().lock().write_all(bytes),
        };
    }
}

fn drain<R>(mut reader: R, echo: Option<Echo>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut captured = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if let Some(target) = echo {
                target.write(&buf[..n]);
            }
            captured.extend_from_slice(&buf[..n]);
        }
        Ok(captured)
    })
}

fn join_reader(handle: JoinHandle<io::Result<Vec<u8>>>, stream: &str) -> Result<String> {
    let bytes = handle
        .join()
        .map_err(|_| anyhow::anyhow!("{stream} reader thread panicked"))?
        .with_context(|| format!("reading child {stream}"))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
