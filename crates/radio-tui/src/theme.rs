//! Color palette and style constants for the radio screen.
//!
//! xterm-256 indices, all on black.

use ratatui::style::{Color, Modifier, Style};

// ── Color palette ─────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Black;
pub const C_KEY: Color = Color::Indexed(44);
pub const C_GENRE: Color = Color::Indexed(181);
pub const C_MUSIC: Color = Color::Indexed(223);
pub const C_ACCENT: Color = Color::Indexed(47);
pub const C_STATION: Color = Color::Indexed(45);
pub const C_VOLUME: Color = Color::Indexed(206);
pub const C_TITLE: Color = Color::Indexed(195);
pub const C_MUTED: Color = Color::Indexed(242);
pub const C_STATUS: Color = Color::Indexed(171);

// ── Predefined styles ─────────────────────────────────────────────────────────

fn fg(color: Color) -> Style {
    Style::default().fg(color).bg(C_BG)
}

pub fn style_app_title() -> Style {
    fg(C_ACCENT).add_modifier(Modifier::BOLD)
}

pub fn style_status() -> Style {
    fg(C_STATUS)
}

pub fn style_genre() -> Style {
    fg(C_GENRE)
}

pub fn style_music() -> Style {
    fg(C_MUSIC)
}

pub fn style_key() -> Style {
    fg(C_KEY)
}

pub fn style_key_selected() -> Style {
    fg(C_ACCENT)
}

pub fn style_station() -> Style {
    fg(C_STATION)
}

pub fn style_title() -> Style {
    fg(C_TITLE)
}

pub fn style_instructions() -> Style {
    fg(C_MUTED).add_modifier(Modifier::ITALIC)
}

pub fn style_volume() -> Style {
    fg(C_VOLUME).add_modifier(Modifier::ITALIC)
}
