//! Core of craft-radio: station catalog, background refresh, playback
//! control and the configuration they share. The terminal front end lives in
//! the `radio-tui` crate.

pub mod catalog;
pub mod config;
pub mod platform;
pub mod playback;
pub mod refresh;
