use crate::note;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors from launching or talking to a child process.
///
/// A child that starts but exits with a nonzero status is *not* an error
/// here; the batch runner reports it and returns an absent result instead.
#[derive(Error, Debug)]
pub enum RunError {
    /// The executable could not be spawned at all.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// An I/O failure while feeding, draining, or waiting on a child that
    /// did start.
    #[error("I/O failure while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// A handle to an externally-compiled executable.
///
/// The descriptor is stateless beyond the path: every run is a fresh
/// invocation with no cached process state between calls. The child is
/// always invoked with no arguments beyond the executable path.
#[derive(Debug, Clone)]
pub struct Program {
    path: PathBuf,
}

impl Program {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Program { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The program's name with any extension stripped, used to derive
    /// per-program filenames such as the persisted-input file.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn launch_error(&self, source: io::Error) -> RunError {
        RunError::Launch {
            program: self.path.display().to_string(),
            source,
        }
    }

    fn io_error(&self, source: io::Error) -> RunError {
        RunError::Io {
            program: self.path.display().to_string(),
            source,
        }
    }

    fn report_unsuccessful(&self, status: ExitStatus) {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                note!("{} interrupted by signal {signal}", self.path.display());
                return;
            }
        }
        note!("{} exited with non-zero status", self.path.display());
    }

    /// Runs the program to completion with the parent's own standard
    /// streams. An unsuccessful exit is reported, not raised.
    pub fn run(&self) -> Result<(), RunError> {
        let mut child = Command::new(&self.path)
            .spawn()
            .map_err(|e| self.launch_error(e))?;
        let status = child.wait().map_err(|e| self.io_error(e))?;
        if !status.success() {
            self.report_unsuccessful(status);
        }
        Ok(())
    }

    /// Runs the program once with `input` fed on stdin and stdout captured
    /// as text.
    ///
    /// Returns `Ok(None)`, after reporting, when the child exits with a
    /// nonzero status or dies to a signal. Only a spawn failure is an `Err`.
    pub fn batch_run(&self, input: &str) -> Result<Option<String>, RunError> {
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        // Feed stdin from a separate thread: writing the whole buffer inline
        // can deadlock once the child fills its stdout pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let payload = input.as_bytes().to_vec();
            thread::spawn(move || {
                let _ = stdin.write_all(&payload);
            })
        });

        let output = child.wait_with_output().map_err(|e| self.io_error(e))?;
        if let Some(handle) = writer {
            let _ = handle.join();
        }

        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
        } else {
            self.report_unsuccessful(output.status);
            Ok(None)
        }
    }

    /// One timed run with all output discarded. Returns the wall-clock
    /// duration, or `None` (reported) if the child did not finish cleanly.
    pub(crate) fn timed_run(&self, input: &str) -> Result<Option<Duration>, RunError> {
        let start = Instant::now();
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits before reading everything closes the pipe;
            // that surfaces through its exit status, not this write.
            let _ = stdin.write_all(input.as_bytes());
        }

        let status = child.wait().map_err(|e| self.io_error(e))?;
        if status.success() {
            Ok(Some(start.elapsed()))
        } else {
            self.report_unsuccessful(status);
            Ok(None)
        }
    }
}

#[cfg(test)]
pub(crate) fn test_target(name: &str) -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let path = manifest_dir.join("../test_targets").join(name);
    assert!(path.exists(), "test target missing: {path:?}");
    path
}
