//! Profiling sessions
//!
//! A [`Session`] is built exactly once per invocation, either by running a
//! target under the profiler ([`Session::capture`]) or by loading a capture
//! document ([`Session::replay`]). Both kinds render identically.

use nix::sys::signal::{signal, SigHandler, Signal};
use nix::unistd::Pid;
use std::fs::File;
use std::io::{self, Read};
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{CaptureError, ReplayError};
use crate::profiler::{Profiler, DEFAULT_INTERVAL};
use crate::report::Report;
use crate::target::{ExecEnv, Target};

/// How the target's run ended, as seen at the instrumentation boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The target exited on its own, with any status
    Completed { exit_code: i32 },
    /// The target was terminated by SIGINT
    Interrupted,
    /// The target was terminated by any other signal
    Failed(String),
}

impl Outcome {
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(exit_code) = status.code() {
            return Self::Completed { exit_code };
        }

        match status.signal() {
            Some(raw) if raw == Signal::SIGINT as i32 => Self::Interrupted,
            Some(raw) => {
                let name = Signal::try_from(raw)
                    .map(|sig| sig.as_str().to_string())
                    .unwrap_or_else(|_| format!("signal {}", raw));
                let cause = if status.core_dumped() {
                    format!("killed by {} (core dumped)", name)
                } else {
                    format!("killed by {}", name)
                };
                Self::Failed(cause)
            }
            None => Self::Failed(format!("unrecognized wait status {:?}", status)),
        }
    }
}

/// Ignores SIGINT in this process until dropped
///
/// A terminal Ctrl-C reaches the whole foreground process group. While the
/// target runs, only the target should react to it.
struct SigintGuard {
    previous: SigHandler,
}

impl SigintGuard {
    fn ignore() -> nix::Result<Self> {
        // SAFETY: SigIgn installs no handler code, so no async-signal-safety concerns.
        let previous = unsafe { signal(Signal::SIGINT, SigHandler::SigIgn) }?;
        Ok(Self { previous })
    }
}

impl Drop for SigintGuard {
    fn drop(&mut self) {
        // SAFETY: restores the disposition that was installed before the guard.
        if let Err(e) = unsafe { signal(Signal::SIGINT, self.previous) } {
            warn!(error = %e, "failed to restore SIGINT disposition");
        }
    }
}

/// Live-capture settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Time between two samples
    pub interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Where a capture document is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    Stdin,
    File(PathBuf),
}

impl CaptureSource {
    /// `-` means standard input, anything else is a path
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(value))
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Stdin => "<stdin>".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }

    /// Read the whole document; the handle is released before returning
    pub fn read_to_string(&self) -> Result<String, ReplayError> {
        let read_error = |source: io::Error| ReplayError::Read {
            source_name: self.name(),
            source,
        };

        let mut reader: Box<dyn Read> = match self {
            Self::Stdin => Box::new(io::stdin().lock()),
            Self::File(path) => Box::new(File::open(path).map_err(read_error)?),
        };

        let mut content = String::new();
        reader.read_to_string(&mut content).map_err(read_error)?;
        Ok(content)
    }
}

/// Whether a session was captured now or reconstructed from storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Fresh,
    Replayed,
}

/// A completed profiling session
#[derive(Debug)]
pub struct Session {
    report: Report,
    origin: Origin,
}

impl Session {
    /// Run `target` under the profiler, with the target's directory first on
    /// its search path
    pub fn capture(target: &Target, config: &CaptureConfig) -> Result<Self, CaptureError> {
        let env = ExecEnv::inherit(target);
        Self::capture_in(target, &env, config)
    }

    /// Run `target` under the profiler inside an explicit environment
    pub fn capture_in(
        target: &Target,
        env: &ExecEnv,
        config: &CaptureConfig,
    ) -> Result<Self, CaptureError> {
        let mut command = target.command(env)?;
        let mut profiler = Profiler::new(target.display_name(), config.interval);

        profiler.start()?;
        let mut child = command.spawn().map_err(|source| CaptureError::Spawn {
            program: target.path().to_path_buf(),
            source,
        })?;
        let pid = Pid::from_raw(child.id() as i32);
        profiler.attach(pid)?;
        info!(%pid, program = %target.path().display(), "target started");

        let status = {
            // Installed after spawn so the child keeps the default SIGINT disposition.
            let _sigint = SigintGuard::ignore()
                .map_err(|e| warn!(error = %e, "could not ignore SIGINT during capture"))
                .ok();
            child.wait()?
        };
        let mut report = profiler.stop()?;

        match Outcome::from_status(status) {
            Outcome::Completed { exit_code } => {
                debug!(exit_code, "target completed");
                report.exit_code = Some(exit_code);
            }
            Outcome::Interrupted => {
                eprintln!("[samplr: target interrupted, keeping the partial capture]");
            }
            Outcome::Failed(cause) => {
                return Err(CaptureError::TargetFailed {
                    program: target.path().to_path_buf(),
                    cause,
                });
            }
        }

        Ok(Self {
            report,
            origin: Origin::Fresh,
        })
    }

    /// Load a session from a capture document
    pub fn replay(source: &CaptureSource) -> Result<Self, ReplayError> {
        let content = source.read_to_string()?;
        debug!(source = %source.name(), bytes = content.len(), "capture read");
        Self::from_json(&content)
    }

    /// Reconstruct a session from capture JSON
    pub fn from_json(data: &str) -> Result<Self, ReplayError> {
        Ok(Self {
            report: Report::from_json(data)?,
            origin: Origin::Replayed,
        })
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn as_json(&self) -> serde_json::Result<String> {
        self.report.as_json()
    }

    pub fn output_html(&self) -> String {
        self.report.output_html()
    }

    pub fn output_text(&self, unicode: bool, color: bool) -> String {
        self.report.output_text(unicode, color)
    }
}
