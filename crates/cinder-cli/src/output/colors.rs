//! Terminal color support detection and formatting.
//!
//! Color use respects the `NO_COLOR` environment variable and is dropped
//! when stdout or stderr is not a terminal.

use std::env;
use std::io::{self, IsTerminal};

/// ANSI color formatting with automatic capability detection
pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    /// Detect color support automatically
    pub fn detect() -> Self {
        let enabled = env::var("NO_COLOR").is_err()
            && io::stderr().is_terminal()
            && io::stdout().is_terminal();
        Self { enabled }
    }

    /// Force enable colors
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    /// Force disable colors
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn green(&self, text: &str) -> String {
        self.paint("32", text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint("33", text)
    }

    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    /// Dim/gray text
    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_colors_pass_text_through() {
        let colors = ColorSupport::disabled();
        assert_eq!(colors.green("ok"), "ok");
        assert_eq!(colors.red("bad"), "bad");
    }

    #[test]
    fn test_enabled_colors_wrap_in_ansi_codes() {
        let colors = ColorSupport::enabled();
        assert_eq!(colors.green("ok"), "\x1b[32mok\x1b[0m");
        assert_eq!(colors.dim("note"), "\x1b[2mnote\x1b[0m");
    }
}
