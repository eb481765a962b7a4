//! The fixed-layout status screen.
//!
//! Top to bottom: app title, status, now-playing (when the selection still
//! points into the catalog), one row per station, key help, and the volume
//! once it has been touched.

use ratatui::{
    layout::Rect,
    text::{Line, Span, Text},
    widgets::{Block, Paragraph},
    Frame,
};

use radio_core::catalog::{Catalog, Station};
use radio_core::playback::PlaybackState;

use crate::keymap::{KeyMap, INSTRUCTIONS};
use crate::theme::{
    style_app_title, style_genre, style_instructions, style_key, style_key_selected, style_music,
    style_station, style_status, style_title, style_volume, C_BG,
};

pub const APP_NAME: &str = "9Craft Radio";

/// The station the selection refers to in this snapshot. A refresh may have
/// shrunk the catalog under the selection, in which case there is none.
pub fn now_playing<'a>(catalog: &'a Catalog, state: &PlaybackState) -> Option<&'a Station> {
    state.selected.and_then(|i| catalog.get(i))
}

pub fn screen_text(catalog: &Catalog, state: &PlaybackState, keys: &KeyMap) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = vec![
        Line::styled(APP_NAME, style_app_title()),
        Line::default(),
        Line::styled(format!("Status: {}", state.status), style_status()),
        Line::default(),
    ];

    if let Some(station) = now_playing(catalog, state) {
        lines.push(Line::styled(
            format!("Genre: {}", station.display_name),
            style_genre(),
        ));
        lines.push(Line::styled(format!("Music: {}", station.title), style_music()));
    }

    if !catalog.is_empty() {
        lines.push(Line::default());
    }
    for (i, station) in catalog.iter().enumerate() {
        let key_style = if state.selected == Some(i) {
            style_key_selected()
        } else {
            style_key()
        };
        let label = keys.label(i).map_or_else(|| "  ".to_string(), |c| format!("{c}."));
        lines.push(Line::from(vec![
            Span::styled(format!("{label} "), key_style),
            Span::styled(format!("{}: ", station.display_name), style_station()),
            Span::styled(station.title.clone(), style_title()),
        ]));
    }

    lines.push(Line::default());
    lines.push(Line::styled(INSTRUCTIONS, style_instructions()));
    if let Some(vol) = state.volume {
        lines.push(Line::default());
        lines.push(Line::styled(format!("Volume: {vol}%"), style_volume()));
    }

    Text::from(lines)
}

/// Draw the whole screen. Rows past the bottom of the terminal are clipped.
pub fn draw(frame: &mut Frame, catalog: &Catalog, state: &PlaybackState, keys: &KeyMap) {
    let area: Rect = frame.area();
    frame.render_widget(
        Paragraph::new(screen_text(catalog, state, keys))
            .block(Block::default().style(ratatui::style::Style::default().bg(C_BG))),
        area,
    );
}
