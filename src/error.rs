//! Structured error types for samplr
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! The binary wraps these in `anyhow` with additional context.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while preparing a target program for live capture
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("Program not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("{0} is not executable and has no #! interpreter line")]
    NotExecutable(PathBuf),

    #[error("{script}: bad interpreter {interpreter}")]
    BadInterpreter { script: PathBuf, interpreter: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid search path entry: {0}")]
    SearchPath(#[from] std::env::JoinPathsError),
}

/// Misuse of the profiling engine
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProfilerError {
    #[error("Profiler already started")]
    AlreadyStarted,

    #[error("Profiler not started")]
    NotStarted,

    #[error("Failed to start sampler thread: {0}")]
    ThreadSpawn(String),

    #[error("Sampler thread panicked")]
    SamplerPanicked,
}

/// Failures during live capture. None of these produce a session.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} terminated abnormally: {cause}")]
    TargetFailed { program: PathBuf, cause: String },

    #[error(transparent)]
    Profiler(#[from] ProfilerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures while reconstructing a session from a capture document
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to read capture from {source_name}: {source}")]
    Read {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed capture data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported capture format: {0:?}")]
    UnsupportedFormat(String),
}

/// Failures while rendering or writing a report
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to open output file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to serialize capture: {0}")]
    Json(#[from] serde_json::Error),
}
