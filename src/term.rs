//! Terminal capability probes
//!
//! Decide whether standard output can take unicode box-drawing glyphs and
//! ANSI colour. Environment access goes through a lookup function so the
//! decisions can be tested without touching the process environment.

use std::io::{self, IsTerminal};

/// Locale variables in POSIX precedence order
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_CTYPE", "LANG"];

/// Result of probing a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerminalProbe {
    /// The stream is attached to an interactive terminal
    pub is_terminal: bool,
    /// The locale names a UTF character set
    pub unicode_locale: bool,
    /// The platform can render ANSI colour
    pub color_platform: bool,
}

impl TerminalProbe {
    /// Probe the real standard output and process environment
    pub fn stdout() -> Self {
        let lookup = |key: &str| std::env::var(key).ok();
        Self {
            is_terminal: io::stdout().is_terminal(),
            unicode_locale: locale_is_unicode(lookup),
            color_platform: platform_supports_color(std::env::consts::OS, lookup),
        }
    }

    pub fn supports_unicode(&self) -> bool {
        self.is_terminal && self.unicode_locale
    }

    pub fn supports_color(&self) -> bool {
        self.is_terminal && self.color_platform
    }
}

/// The first non-empty of `LC_ALL`, `LC_CTYPE`, `LANG` mentions "utf"
pub fn locale_is_unicode<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    LOCALE_VARS
        .iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
        .map(|value| value.to_lowercase().contains("utf"))
        .unwrap_or(false)
}

/// Windows consoles only get colour when ANSICON is present
pub fn platform_supports_color<F>(os: &str, lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    os != "windows" || lookup("ANSICON").is_some()
}
