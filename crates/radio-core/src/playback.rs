//! Playback controller: the selected station, play/pause and volume, on top
//! of an opaque [`MediaEngine`].

use std::future::Future;

use tracing::{debug, info};

use crate::catalog::Catalog;

pub const STATUS_WAITING: &str = "Waiting for channel selection...";
pub const STATUS_PLAYING: &str = "Playing...";
pub const STATUS_PAUSED: &str = "Paused";
pub const STATUS_INVALID: &str = "Invalid selection";

/// A stream the engine can load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub url: String,
}

/// The operations the controller needs from an audio backend. Engine errors
/// are returned as-is; the controller does not retry.
pub trait MediaEngine {
    fn create_media(&self, url: &str) -> Media {
        Media {
            url: url.to_string(),
        }
    }
    fn load(&mut self, media: Media) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn play(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn stop(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;
    /// Current volume in percent.
    fn volume(&mut self) -> impl Future<Output = anyhow::Result<u8>> + Send;
    fn set_volume(&mut self, percent: u8) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// What the screen shows about playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    /// Catalog index last chosen with a station key.
    pub selected: Option<usize>,
    pub is_playing: bool,
    /// `None` until the volume has been adjusted once.
    pub volume: Option<u8>,
    pub status: String,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            selected: None,
            is_playing: false,
            volume: None,
            status: STATUS_WAITING.to_string(),
        }
    }
}

pub struct PlaybackController<E> {
    engine: E,
    state: PlaybackState,
}

impl<E: MediaEngine> PlaybackController<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: PlaybackState::default(),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Start the station at `index` of `catalog`. Out-of-range indices only
    /// change the status line.
    pub async fn play(&mut self, index: usize, catalog: &Catalog) -> anyhow::Result<()> {
        let Some(station) = catalog.get(index) else {
            debug!("playback: index {} outside catalog of {}", index, catalog.len());
            self.state.status = STATUS_INVALID.to_string();
            return Ok(());
        };

        info!("playback: {} -> {}", station.display_name, station.stream_url);
        let media = self.engine.create_media(&station.stream_url);
        self.engine.stop().await?;
        self.engine.load(media).await?;
        self.engine.play().await?;

        self.state.selected = Some(index);
        self.state.is_playing = true;
        self.state.status = STATUS_PLAYING.to_string();
        Ok(())
    }

    /// Pause (stop the engine) or resume the loaded stream. Does nothing
    /// until a station has been selected.
    pub async fn toggle_play_pause(&mut self) -> anyhow::Result<()> {
        if self.state.selected.is_none() {
            return Ok(());
        }
        if self.state.is_playing {
            self.engine.stop().await?;
            self.state.status = STATUS_PAUSED.to_string();
        } else {
            self.engine.play().await?;
            self.state.status = STATUS_PLAYING.to_string();
        }
        self.state.is_playing = !self.state.is_playing;
        Ok(())
    }

    /// Move the engine volume by `delta` percent, clamped to `0..=100`.
    pub async fn adjust_volume(&mut self, delta: i32) -> anyhow::Result<u8> {
        let current = i32::from(self.engine.volume().await?);
        let next = (current + delta).clamp(0, 100) as u8;
        self.engine.set_volume(next).await?;
        self.state.volume = Some(next);
        debug!("playback: volume {} -> {}", current, next);
        Ok(next)
    }
}
