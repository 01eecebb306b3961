//! Theme and color definitions for terminal output.

use crossterm::style::{Color, Stylize, style};

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    pub info: Color,
    pub muted: Color,
    pub accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
            info: Color::Blue,
            muted: Color::DarkGrey,
            accent: Color::Cyan,
        }
    }
}

impl Theme {
    /// Wrap `text` in the ANSI sequence for `color`.
    #[must_use]
    pub fn paint(text: &str, color: Color) -> String {
        style(text).with(color).to_string()
    }

    #[must_use]
    pub fn bold(text: &str, color: Color) -> String {
        style(text).with(color).bold().to_string()
    }
}
