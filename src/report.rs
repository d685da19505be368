//! Capture document and its renderings
//!
//! A [`Report`] is what the profiler produces and what a capture file holds.
//! Times are integer microseconds so a JSON round trip is exact.

use serde::{Deserialize, Serialize};

use crate::error::ReplayError;
use crate::frame::Frame;
use crate::{html_output, text_output};

/// Format tag written into every capture document
pub const FORMAT_TAG: &str = "samplr-json-v1";

/// Root capture structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Format identifier, always [`FORMAT_TAG`]
    pub format: String,
    /// Version of samplr that produced the capture
    pub version: String,
    /// Display name of the profiled program
    pub program: String,
    /// Wall-clock start, milliseconds since the Unix epoch
    pub start_time_ms: u64,
    /// Wall time between instrumentation start and stop
    pub duration_us: u64,
    /// Requested sampling interval
    pub interval_us: u64,
    /// Number of thread snapshots folded into the tree
    pub sample_count: u64,
    /// Exit status of the target (absent if it was interrupted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Aggregated call tree
    pub root_frame: Frame,
}

impl Report {
    /// Serialize to the capture format
    pub fn as_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a capture document
    pub fn from_json(data: &str) -> Result<Self, ReplayError> {
        let report: Report = serde_json::from_str(data)?;
        if report.format != FORMAT_TAG {
            return Err(ReplayError::UnsupportedFormat(report.format));
        }
        Ok(report)
    }

    /// Self-contained HTML report
    pub fn output_html(&self) -> String {
        html_output::HtmlOutput::new(self).to_html()
    }

    /// Plain-text call tree
    pub fn output_text(&self, unicode: bool, color: bool) -> String {
        text_output::TextOutput::new(unicode, color).render(self)
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_us as f64 / 1_000_000.0
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_us as f64 / 1_000_000.0
    }
}
