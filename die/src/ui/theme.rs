//! Shared UI theme constants: the red meter ramp and role styles.

use ratatui::style::{Color, Modifier, Style};

/// Meter fill ramp, darkest at the base.
pub const RAMP: [Color; 6] = [
    Color::Rgb(0x3a, 0x0c, 0x0c),
    Color::Rgb(0x5a, 0x12, 0x12),
    Color::Rgb(0x7a, 0x17, 0x17),
    Color::Rgb(0x9a, 0x1d, 0x1d),
    Color::Rgb(0xbc, 0x22, 0x22),
    Color::Rgb(0xff, 0x2a, 0x2a),
];

pub const METER_EMPTY: Color = Color::Rgb(0x20, 0x20, 0x20);

pub fn logo() -> Style {
    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
}

pub fn header_text() -> Style {
    Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
}

pub fn selected_row() -> Style {
    Style::default()
        .fg(Color::White)
        .bg(Color::Red)
        .add_modifier(Modifier::BOLD)
}

pub fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn key_magenta() -> Style {
    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
}

pub fn key_red() -> Style {
    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
}

pub fn key_blue() -> Style {
    Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)
}

pub fn key_green() -> Style {
    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
}

pub fn key_cyan() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}
