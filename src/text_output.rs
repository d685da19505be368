//! Text report: an indented call tree with optional unicode and colour

use std::fmt::Write as _;

use crate::frame::Frame;
use crate::report::Report;

/// ANSI escape sequences used by the coloured report
mod ansi {
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const BRIGHT_GREEN: &str = "\x1b[92m";
    pub const BOLD: &str = "\x1b[1m";
    pub const FAINT: &str = "\x1b[2m";
    pub const RESET: &str = "\x1b[0m";
}

/// Tree-drawing glyphs
struct Glyphs {
    branch: &'static str,
    pipe: &'static str,
    last: &'static str,
    rule: &'static str,
}

const UNICODE_GLYPHS: Glyphs = Glyphs {
    branch: "├─ ",
    pipe: "│  ",
    last: "└─ ",
    rule: "─",
};

const ASCII_GLYPHS: Glyphs = Glyphs {
    branch: "|- ",
    pipe: "|  ",
    last: "`- ",
    rule: "-",
};

const SPACE: &str = "   ";

/// Text report formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOutput {
    unicode: bool,
    color: bool,
}

impl TextOutput {
    pub fn new(unicode: bool, color: bool) -> Self {
        Self { unicode, color }
    }

    fn glyphs(&self) -> &'static Glyphs {
        if self.unicode {
            &UNICODE_GLYPHS
        } else {
            &ASCII_GLYPHS
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", code, text, ansi::RESET)
        } else {
            text.to_string()
        }
    }

    /// Colour for a frame's time, by its share of the root time
    fn time_color(proportion: f64) -> &'static str {
        if proportion > 0.6 {
            ansi::RED
        } else if proportion > 0.3 {
            ansi::YELLOW
        } else if proportion > 0.2 {
            ansi::GREEN
        } else {
            ansi::BRIGHT_GREEN
        }
    }

    fn render_header(&self, report: &Report, out: &mut String) {
        let title = format!("samplr  {}", report.program);
        let _ = writeln!(out, "{}", self.paint(ansi::BOLD, &title));

        let mut summary = format!(
            "Samples: {}  Duration: {:.3}s  Interval: {:.3}s",
            report.sample_count,
            report.duration_secs(),
            report.interval_secs()
        );
        if let Some(code) = report.exit_code {
            let _ = write!(summary, "  Exit code: {}", code);
        }
        let _ = writeln!(out, "{}", summary);
        let _ = writeln!(out, "{}", self.glyphs().rule.repeat(summary.chars().count()));
        out.push('\n');
    }

    fn render_frame(
        &self,
        frame: &Frame,
        total_us: u64,
        indent: &str,
        child_indent: &str,
        out: &mut String,
    ) {
        let proportion = if total_us > 0 {
            frame.time_us as f64 / total_us as f64
        } else {
            0.0
        };

        let time = format!("{:.3}", frame.time_secs());
        let mut time_code = Self::time_color(proportion).to_string();
        if proportion <= 0.2 {
            time_code.push_str(ansi::FAINT);
        }

        let _ = write!(out, "{}{} {}", indent, self.paint(&time_code, &time), frame.function);
        if let Some(location) = &frame.location {
            let _ = write!(out, "  {}", self.paint(ansi::FAINT, location));
        }
        out.push('\n');

        let glyphs = self.glyphs();
        let count = frame.children.len();
        for (index, child) in frame.children.iter().enumerate() {
            let is_last = index + 1 == count;
            let (branch, continuation) = if is_last {
                (glyphs.last, SPACE)
            } else {
                (glyphs.branch, glyphs.pipe)
            };

            self.render_frame(
                child,
                total_us,
                &format!("{}{}", child_indent, branch),
                &format!("{}{}", child_indent, continuation),
                out,
            );
        }
    }

    /// Render the complete report
    pub fn render(&self, report: &Report) -> String {
        let mut out = String::new();
        self.render_header(report, &mut out);

        let root = &report.root_frame;
        if root.time_us == 0 && root.children.is_empty() {
            out.push_str("No samples were recorded.\n");
        } else {
            self.render_frame(root, root.time_us, "", "", &mut out);
        }

        out.push('\n');
        out
    }
}
