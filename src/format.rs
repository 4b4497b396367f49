use yansi::Paint;

/// Color palette for consistent theming
pub struct ColorPalette {
    pub header: (u8, u8, u8),
    pub accent: (u8, u8, u8),
    pub ok: (u8, u8, u8),
    pub warn: (u8, u8, u8),
}

impl ColorPalette {
    pub const CATPPUCCIN: Self = Self {
        header: (148, 226, 213), // Teal
        accent: (137, 180, 250), // Blue
        ok: (166, 227, 161),     // Green
        warn: (243, 139, 168),   // Pink
    };
}

/// Formatting context passed through every console flow
pub struct FormatContext {
    pub use_color: bool,
    pub palette: ColorPalette,
}

impl FormatContext {
    pub fn new(use_color: bool) -> Self {
        Self { use_color, palette: ColorPalette::CATPPUCCIN }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("NO_COLOR").is_err())
    }

    pub fn header(&self, text: &str) -> String {
        if self.use_color {
            let (r, g, b) = self.palette.header;
            Paint::rgb(text, r, g, b).bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn accent(&self, text: &str) -> String {
        if self.use_color {
            let (r, g, b) = self.palette.accent;
            Paint::rgb(text, r, g, b).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn ok(&self, text: &str) -> String {
        if self.use_color {
            let (r, g, b) = self.palette.ok;
            Paint::rgb(text, r, g, b).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn warn(&self, text: &str) -> String {
        if self.use_color {
            let (r, g, b) = self.palette.warn;
            Paint::rgb(text, r, g, b).bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Truncate text to a width, appending an ellipsis when needed. Display
/// only; stored values are never touched by this.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    let len = text.chars().count();
    if len <= max_width {
        return text.to_string();
    }
    if max_width == 1 {
        return "…".to_string();
    }
    let mut out =
        text.chars().take(max_width.saturating_sub(1)).collect::<String>();
    out.push('…');
    out
}

/// Section separator line.
pub fn rule(width: usize) -> String {
    "=".repeat(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_color_passes_text_through() {
        let ctx = FormatContext::new(false);
        assert_eq!(ctx.header("Menu"), "Menu");
        assert_eq!(ctx.warn("bad"), "bad");
    }

    #[test]
    fn color_wraps_in_ansi() {
        let ctx = FormatContext::new(true);
        let painted = ctx.ok("saved");
        assert!(painted.contains("saved"));
        assert!(painted.len() > "saved".len());
    }

    #[test]
    fn truncate_leaves_short_text_alone() {
        assert_eq!(truncate_with_ellipsis("short", 100), "short");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        let long = "x".repeat(120);
        let out = truncate_with_ellipsis(&long, 100);
        assert_eq!(out.chars().count(), 100);
        assert!(out.ends_with('…'));
    }
}
