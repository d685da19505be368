//! Report rendering
//!
//! Format resolution is a pure decision over format, destination, and the
//! terminal probe. Writing renders the whole report into memory first and
//! only then opens the destination, so a failed render never creates a file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

use crate::error::RenderError;
use crate::session::Session;
use crate::term::TerminalProbe;

/// Output format chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable call tree (default)
    #[default]
    Text,
    /// Self-contained HTML document
    Html,
    /// Raw capture document, replayable with `-i`
    Json,
}

/// Where the rendered report goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    pub fn from_outfile(outfile: Option<PathBuf>) -> Self {
        outfile.map_or(Self::Stdout, Self::File)
    }
}

/// Fully resolved rendering intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRequest {
    Json,
    Html,
    Text { unicode: bool, color: bool },
}

/// Resolve the format and its flags for a destination
///
/// Files always get unicode without colour. Standard output takes both flags
/// from the probe. Only the text format carries flags.
pub fn resolve_request(
    format: OutputFormat,
    destination: &Destination,
    probe: &TerminalProbe,
) -> OutputRequest {
    match format {
        OutputFormat::Json => OutputRequest::Json,
        OutputFormat::Html => OutputRequest::Html,
        OutputFormat::Text => match destination {
            Destination::File(_) => OutputRequest::Text {
                unicode: true,
                color: false,
            },
            Destination::Stdout => OutputRequest::Text {
                unicode: probe.supports_unicode(),
                color: probe.supports_color(),
            },
        },
    }
}

/// Render a session for a resolved request
pub fn render(session: &Session, request: OutputRequest) -> Result<String, RenderError> {
    Ok(match request {
        OutputRequest::Json => session.as_json()?,
        OutputRequest::Html => session.output_html(),
        OutputRequest::Text { unicode, color } => session.output_text(unicode, color),
    })
}

/// Write already-rendered output to a destination
///
/// The file is opened here and closed on drop on every path; stdout is locked
/// for the duration of the write and never closed.
pub fn write_rendered(output: &str, destination: &Destination) -> Result<(), RenderError> {
    match destination {
        Destination::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
        Destination::File(path) => {
            let file = File::create(path).map_err(|source| RenderError::Open {
                path: path.clone(),
                source,
            })?;
            let mut writer = BufWriter::new(file);
            writer.write_all(output.as_bytes())?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// Render `session` and write it to `destination`, consuming the session
pub fn write_output(
    session: Session,
    format: OutputFormat,
    destination: &Destination,
) -> Result<(), RenderError> {
    let probe = match destination {
        Destination::Stdout => TerminalProbe::stdout(),
        Destination::File(_) => TerminalProbe::default(),
    };
    let request = resolve_request(format, destination, &probe);
    debug!(?request, ?destination, origin = ?session.origin(), "rendering");

    let output = render(&session, request)?;
    write_rendered(&output, destination)
}
