//! Output styles using the owo-colors stylesheet pattern.

use owo_colors::Style;

/// Centralized stylesheet for CLI output colors. Starts unstyled; call
/// `colorize` only when the terminal wants color.
#[derive(Default, Clone)]
pub struct Styles {
    /// Success lines (green).
    pub success: Style,
    /// Warnings (yellow).
    pub warning: Style,
    /// Errors (red).
    pub error: Style,
    /// Dimmed/secondary text (package versions, paths).
    pub dim: Style,
    /// Emphasis (package ids).
    pub bold: Style,
    /// Section headers (kind groups, providers).
    pub header: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.dim = Style::new().dimmed();
        self.bold = Style::new().bold();
        self.header = Style::new().bold().cyan();
    }
}
