//! CLI argument parsing for samplr

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::render::{Destination, OutputFormat};
use crate::session::{CaptureConfig, CaptureSource};

#[derive(Parser, Debug)]
#[command(name = "samplr")]
#[command(version)]
#[command(about = "Statistical profiler: run a program under sampling or replay a capture", long_about = None)]
#[command(override_usage = "samplr [OPTIONS] [-o <OUTFILE>] <SCRIPT> [ARGS]...\n       samplr [OPTIONS] -i <INFILE>")]
pub struct Cli {
    /// Output HTML instead of text
    #[arg(long = "html", conflicts_with = "json")]
    pub html: bool,

    /// Output the raw JSON capture instead of text or HTML
    #[arg(long = "json")]
    pub json: bool,

    /// Save the report to <OUTFILE> instead of printing it
    #[arg(short = 'o', long = "outfile", value_name = "OUTFILE")]
    pub outfile: Option<PathBuf>,

    /// Load a capture from JSON file <INFILE> ('-' for stdin) instead of running a program
    #[arg(short = 'i', long = "infile", value_name = "INFILE")]
    pub infile: Option<String>,

    /// Sampling interval in seconds
    #[arg(long = "interval", value_name = "SECONDS", default_value = "0.001", value_parser = parse_interval)]
    pub interval: Duration,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,

    /// Program to profile followed by its own arguments
    #[arg(value_name = "SCRIPT", trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// What one invocation does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Run a program under the profiler
    Live { program: String, args: Vec<String> },
    /// Load a previous capture
    Replay(CaptureSource),
    /// Nothing to do; print usage
    Usage,
}

fn parse_interval(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("invalid number of seconds: {}", value))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("interval must be a positive number of seconds, got {}", value));
    }
    let interval = Duration::try_from_secs_f64(seconds)
        .map_err(|e| format!("invalid interval {}: {}", value, e))?;
    if interval < Duration::from_micros(1) {
        return Err(format!("interval must be at least 1 microsecond, got {}", value));
    }
    Ok(interval)
}

impl Cli {
    /// A program on the command line wins over `-i`
    pub fn invocation(&self) -> Invocation {
        if let Some((program, args)) = self.command.split_first() {
            Invocation::Live {
                program: program.clone(),
                args: args.to_vec(),
            }
        } else if let Some(infile) = &self.infile {
            Invocation::Replay(CaptureSource::parse(infile))
        } else {
            Invocation::Usage
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.html {
            OutputFormat::Html
        } else {
            OutputFormat::Text
        }
    }

    pub fn destination(&self) -> Destination {
        Destination::from_outfile(self.outfile.clone())
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            interval: self.interval,
        }
    }
}
