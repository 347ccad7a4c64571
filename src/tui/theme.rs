use ratatui::style::Color;

/// Fixed palette for the board UI.
pub struct Theme {
    pub accent: Color,
    pub error: Color,
    pub dim: Color,
    pub selection_bg: Color,
    pub overlay: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            accent: Color::Cyan,
            error: Color::Red,
            dim: Color::DarkGray,
            selection_bg: Color::Rgb(40, 44, 52),
            overlay: Color::Yellow,
        }
    }
}

/// Map a configured stage color name to a terminal color.
pub fn stage_color(name: Option<&str>) -> Color {
    match name {
        Some("blue") => Color::Blue,
        Some("cyan") => Color::Cyan,
        Some("green") => Color::Green,
        Some("yellow") => Color::Yellow,
        Some("red") => Color::Red,
        Some("magenta") => Color::Magenta,
        _ => Color::White,
    }
}
