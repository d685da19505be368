//! HTML output format for profiling reports
//!
//! Self-contained document with embedded CSS. The call tree is rendered as
//! nested `<details>` elements so it stays collapsible without scripts.

use crate::frame::Frame;
use crate::report::Report;

/// Frames below this share of the root time start collapsed
const COLLAPSE_BELOW: f64 = 0.1;

/// HTML output formatter
#[derive(Debug)]
pub struct HtmlOutput<'a> {
    report: &'a Report,
}

impl<'a> HtmlOutput<'a> {
    /// Create a new HTML output formatter
    pub fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Escape HTML special characters to prevent XSS
    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    /// Generate embedded CSS styles
    fn generate_styles() -> &'static str {
        r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px;
            background-color: #f5f5f5;
        }
        h1, h2 {
            color: #333;
        }
        table {
            border-collapse: collapse;
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }
        th, td {
            border: 1px solid #ddd;
            padding: 8px;
            text-align: left;
        }
        th {
            background-color: #4a90d9;
            color: white;
            font-weight: bold;
        }
        .tree {
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            padding: 12px;
            font-family: monospace;
        }
        details {
            margin-left: 18px;
        }
        .tree > details {
            margin-left: 0;
        }
        summary, .leaf {
            padding: 2px 0;
        }
        .leaf {
            margin-left: 18px;
        }
        .time {
            font-weight: bold;
            margin-right: 6px;
        }
        .time-high {
            color: #cc0000;
        }
        .time-medium {
            color: #c08000;
        }
        .time-low {
            color: #2a8a2a;
        }
        .time-minor {
            color: #7fbf7f;
        }
        .function {
            color: #0066cc;
        }
        .location {
            font-size: 0.85em;
            color: #888;
            margin-left: 8px;
        }
        .footer {
            margin-top: 20px;
            font-size: 0.8em;
            color: #888;
            text-align: center;
        }
        "#
    }

    fn time_class(proportion: f64) -> &'static str {
        if proportion > 0.6 {
            "time time-high"
        } else if proportion > 0.3 {
            "time time-medium"
        } else if proportion > 0.2 {
            "time time-low"
        } else {
            "time time-minor"
        }
    }

    /// Format the label of a single frame
    fn format_label(frame: &Frame, proportion: f64) -> String {
        let mut label = format!(
            r#"<span class="{}">{:.3}</span><span class="function" title="self {:.3} s">{}</span>"#,
            Self::time_class(proportion),
            frame.time_secs(),
            frame.self_time_us() as f64 / 1_000_000.0,
            Self::escape_html(&frame.function)
        );

        if let Some(location) = &frame.location {
            label.push_str(&format!(
                r#"<span class="location">{}</span>"#,
                Self::escape_html(location)
            ));
        }

        label
    }

    fn render_frame(&self, frame: &Frame, total_us: u64, depth: usize, html: &mut String) {
        let proportion = if total_us > 0 {
            frame.time_us as f64 / total_us as f64
        } else {
            0.0
        };
        let pad = "    ".repeat(depth + 2);
        let label = Self::format_label(frame, proportion);

        if frame.children.is_empty() {
            html.push_str(&format!("{}<div class=\"leaf\">{}</div>\n", pad, label));
            return;
        }

        let open = if proportion >= COLLAPSE_BELOW { " open" } else { "" };
        html.push_str(&format!("{}<details{}>\n", pad, open));
        html.push_str(&format!("{}    <summary>{}</summary>\n", pad, label));
        for child in &frame.children {
            self.render_frame(child, total_us, depth + 1, html);
        }
        html.push_str(&format!("{}</details>\n", pad));
    }

    /// Render the capture summary as a table
    fn render_summary(&self) -> String {
        let report = self.report;
        let mut rows = vec![
            ("Program", Self::escape_html(&report.program)),
            ("Samples", report.sample_count.to_string()),
            ("Duration", format!("{:.3} s", report.duration_secs())),
            ("Interval", format!("{:.3} s", report.interval_secs())),
        ];
        if let Some(code) = report.exit_code {
            rows.push(("Exit code", code.to_string()));
        }

        let mut html = String::new();
        html.push_str("    <table class=\"summary\">\n");
        for (name, value) in rows {
            html.push_str(&format!(
                "        <tr><th>{}</th><td>{}</td></tr>\n",
                name, value
            ));
        }
        html.push_str("    </table>\n");
        html
    }

    /// Generate complete HTML document
    pub fn to_html(&self) -> String {
        let mut html = String::new();

        // DOCTYPE and HTML start
        html.push_str("<!DOCTYPE html>\n");
        html.push_str("<html lang=\"en\">\n");

        // Head section
        html.push_str("<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str(
            "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        html.push_str(&format!(
            "    <title>samplr: {}</title>\n",
            Self::escape_html(&self.report.program)
        ));
        html.push_str("    <style>");
        html.push_str(Self::generate_styles());
        html.push_str("</style>\n");
        html.push_str("</head>\n");

        // Body section
        html.push_str("<body>\n");
        html.push_str("    <h1>Profile Report</h1>\n");
        html.push_str(&self.render_summary());

        html.push_str("    <h2>Call Tree</h2>\n");
        html.push_str("    <div class=\"tree\">\n");
        let root = &self.report.root_frame;
        if root.time_us == 0 && root.children.is_empty() {
            html.push_str("        <p>No samples were recorded.</p>\n");
        } else {
            self.render_frame(root, root.time_us, 0, &mut html);
        }
        html.push_str("    </div>\n");

        // Footer
        html.push_str("    <div class=\"footer\">\n");
        html.push_str("        Generated by samplr - Statistical Profiler\n");
        html.push_str("    </div>\n");

        html.push_str("</body>\n");
        html.push_str("</html>\n");

        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::sample_report;

    #[test]
    fn test_html_escape() {
        assert_eq!(HtmlOutput::escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(HtmlOutput::escape_html("a&b"), "a&amp;b");
        assert_eq!(HtmlOutput::escape_html("\"test\""), "&quot;test&quot;");
        assert_eq!(HtmlOutput::escape_html("'test'"), "&#39;test&#39;");
    }

    #[test]
    fn test_html_output_basic_structure() {
        let report = sample_report();
        let html = HtmlOutput::new(&report).to_html();

        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("<head>"));
        assert!(html.contains("<body>"));
        assert!(html.contains("<style>"));
        assert!(html.contains("<table"));
    }

    #[test]
    fn test_html_output_contains_tree() {
        let report = sample_report();
        let html = HtmlOutput::new(&report).to_html();

        assert!(html.contains("<details open>"));
        assert!(html.contains(
            r#"<span class="function" title="self 0.700 s">hrtimer_nanosleep</span>"#
        ));
        assert!(html.contains(r#"<span class="location">tid 101</span>"#));
        assert!(html.contains(r#"<span class="time time-high">1.000</span>"#));
        assert_eq!(html.matches("<details").count(), html.matches("</details>").count());
    }

    #[test]
    fn test_html_output_escape_xss() {
        let mut report = sample_report();
        report.program = "<script>alert('xss')</script>".to_string();
        report.root_frame.function = report.program.clone();

        let html = HtmlOutput::new(&report).to_html();
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_html_output_summary() {
        let report = sample_report();
        let html = HtmlOutput::new(&report).to_html();
        assert!(html.contains("<tr><th>Samples</th><td>4</td></tr>"));
        assert!(html.contains("<tr><th>Exit code</th><td>0</td></tr>"));
    }

    #[test]
    fn test_html_output_minor_frames_start_collapsed() {
        let report = sample_report();
        let html = HtmlOutput::new(&report).to_html();
        // the worker's sleeping subtree holds 5% of the time
        assert!(html.contains("<details>\n"));
    }

    #[test]
    fn test_html_output_empty_report() {
        let mut report = sample_report();
        report.root_frame = Frame::new("job.sh", None);
        let html = HtmlOutput::new(&report).to_html();
        assert!(html.contains("No samples were recorded."));
    }
}
