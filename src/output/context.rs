use super::Theme;
use crate::error::Result;
use std::cell::RefCell;
use std::io::{IsTerminal, Write};
use std::rc::Rc;

/// Central output coordinator that respects json/quiet/no-color modes.
pub struct OutputContext {
    mode: OutputMode,
    theme: Theme,
    sink: Sink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Colored human-readable output
    Rich,
    /// Plain text, no ANSI codes (for piping)
    Plain,
    /// JSON output only
    Json,
    /// Errors only
    Quiet,
}

enum Sink {
    Stdout,
    Capture(CaptureBuffer),
}

/// In-memory stdout replacement used by tests.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer(Rc<RefCell<Vec<u8>>>);

impl CaptureBuffer {
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl OutputContext {
    /// Create from CLI-style flags.
    #[must_use]
    pub fn from_flags(json: bool, quiet: bool, no_color: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else if no_color || std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal()
        {
            OutputMode::Plain
        } else {
            OutputMode::Rich
        };

        Self {
            mode,
            theme: Theme::default(),
            sink: Sink::Stdout,
        }
    }

    /// Context writing into a buffer instead of stdout.
    #[must_use]
    pub fn capture(mode: OutputMode) -> (Self, CaptureBuffer) {
        let buffer = CaptureBuffer::default();
        let ctx = Self {
            mode,
            theme: Theme::default(),
            sink: Sink::Capture(buffer.clone()),
        };
        (ctx, buffer)
    }

    // ─────────────────────────────────────────────────────────────
    // Mode Checks
    // ─────────────────────────────────────────────────────────────

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }
    /// Whether human-readable lines are printed at all.
    pub fn is_human(&self) -> bool {
        matches!(self.mode, OutputMode::Rich | OutputMode::Plain)
    }

    fn write_line(&self, line: &str) {
        match &self.sink {
            Sink::Stdout => println!("{line}"),
            Sink::Capture(buffer) => {
                let mut bytes = buffer.0.borrow_mut();
                // Writing into a Vec cannot fail.
                let _ = writeln!(bytes, "{line}");
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Output Methods
    // ─────────────────────────────────────────────────────────────

    /// Emit `value` as pretty JSON when in JSON mode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json_pretty<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        if self.is_json() {
            let text = serde_json::to_string_pretty(value)?;
            self.write_line(&text);
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Semantic Output Methods
    // ─────────────────────────────────────────────────────────────

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Rich => self.write_line(&format!(
                "{} {message}",
                Theme::bold("✓", self.theme.success)
            )),
            OutputMode::Plain => self.write_line(&format!("✓ {message}")),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn failure(&self, message: &str) {
        match self.mode {
            OutputMode::Rich => self.write_line(&format!(
                "{} {}",
                Theme::bold("✗", self.theme.error),
                Theme::paint(message, self.theme.error)
            )),
            OutputMode::Plain => self.write_line(&format!("✗ {message}")),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Rich => self.write_line(&format!(
                "{} {}",
                Theme::bold("⚠", self.theme.warning),
                Theme::paint(message, self.theme.warning)
            )),
            OutputMode::Plain => self.write_line(&format!("Warning: {message}")),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn info(&self, message: &str) {
        if self.is_human() {
            self.write_line(message);
        }
    }

    /// Secondary detail line, dimmed in rich mode.
    pub fn muted(&self, message: &str) {
        match self.mode {
            OutputMode::Rich => self.write_line(&Theme::paint(message, self.theme.muted)),
            OutputMode::Plain => self.write_line(message),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }

    pub fn section(&self, title: &str) {
        match self.mode {
            OutputMode::Rich => self.write_line(&format!(
                "\n{}",
                Theme::bold(&format!("─── {title} ───"), self.theme.accent)
            )),
            OutputMode::Plain => self.write_line(&format!("\n─── {title} ───")),
            OutputMode::Quiet | OutputMode::Json => {}
        }
    }
}
