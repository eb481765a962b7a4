//! Key bindings: which keypress does what.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Station keys, in catalog order. The last one, `p`, is also a pause key
/// and pause wins, so the 20th station has no key.
pub const STATION_KEYS: &str = "1234567890qwertyuiop";

/// Keys that toggle play/pause ahead of any station binding.
const PAUSE_KEYS: [char; 3] = [' ', 'p', 'P'];

pub const INSTRUCTIONS: &str =
    "Space or \"P\" for play/pause, UP & DOWN keys for volume, \"Esc\" to exit";

const VOLUME_STEP: i32 = 5;

/// Everything a keypress can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    /// Ctrl-C in raw mode; quits like `Quit`.
    Interrupt,
    Volume(i32),
    TogglePause,
    /// Play the station at this catalog position.
    Play(usize),
    Noop,
}

/// ASCII lookup from station key to catalog position, built once at startup.
pub struct KeyMap {
    slots: [Option<u8>; 128],
}

impl KeyMap {
    pub fn new() -> Self {
        let mut slots = [None; 128];
        for (pos, b) in STATION_KEYS.bytes().enumerate() {
            if !PAUSE_KEYS.contains(&char::from(b)) {
                slots[usize::from(b)] = Some(pos as u8);
            }
        }
        Self { slots }
    }

    /// Catalog position bound to `c`, if any.
    pub fn position(&self, c: char) -> Option<usize> {
        let b = u8::try_from(c).ok()?;
        self.slots.get(usize::from(b)).copied().flatten().map(usize::from)
    }

    /// Key label shown next to catalog row `pos`; none when no key selects it.
    pub fn label(&self, pos: usize) -> Option<char> {
        let c = char::from(*STATION_KEYS.as_bytes().get(pos)?);
        (self.position(c) == Some(pos)).then_some(c)
    }

    pub fn action_for(&self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Interrupt,
            KeyCode::Esc => Action::Quit,
            KeyCode::Up => Action::Volume(VOLUME_STEP),
            KeyCode::Down => Action::Volume(-VOLUME_STEP),
            KeyCode::Char(c) if PAUSE_KEYS.contains(&c) => Action::TogglePause,
            KeyCode::Char(c) => self.position(c).map_or(Action::Noop, Action::Play),
            _ => Action::Noop,
        }
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_every_station_key_maps_to_its_position() {
        let km = KeyMap::new();
        assert_eq!(STATION_KEYS.len(), 20);
        for (pos, c) in STATION_KEYS.chars().take(19).enumerate() {
            assert_eq!(km.action_for(key(KeyCode::Char(c))), Action::Play(pos));
            assert_eq!(km.label(pos), Some(c));
        }
        assert_eq!(km.label(20), None);
    }

    #[test]
    fn test_pause_wins_over_the_last_station_key() {
        let km = KeyMap::new();
        assert_eq!(km.action_for(key(KeyCode::Char('p'))), Action::TogglePause);
        assert_eq!(km.position('p'), None);
        assert_eq!(km.label(19), None);
    }

    #[test]
    fn test_control_keys() {
        let km = KeyMap::new();
        assert_eq!(km.action_for(key(KeyCode::Esc)), Action::Quit);
        assert_eq!(km.action_for(key(KeyCode::Up)), Action::Volume(5));
        assert_eq!(km.action_for(key(KeyCode::Down)), Action::Volume(-5));
        for c in [' ', 'p', 'P'] {
            assert_eq!(km.action_for(key(KeyCode::Char(c))), Action::TogglePause);
        }
        assert_eq!(
            km.action_for(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Interrupt
        );
    }

    #[test]
    fn test_unbound_keys_are_noops() {
        let km = KeyMap::new();
        for c in ['a', 'Q', 'z', '!', 'é', '字'] {
            assert_eq!(km.action_for(key(KeyCode::Char(c))), Action::Noop, "{c:?}");
        }
        assert_eq!(km.action_for(key(KeyCode::Enter)), Action::Noop);
        assert_eq!(km.action_for(key(KeyCode::Left)), Action::Noop);
        // Plain 'c' is not bound either.
        assert_eq!(km.action_for(key(KeyCode::Char('c'))), Action::Noop);
    }
}
