//! App — the interactive loop.
//!
//! - A blocking reader task forwards terminal events over an mpsc channel.
//! - Each key is mapped to an `Action` and handled to completion, playback
//!   included, before the screen is redrawn and the next key is taken.
//! - The catalog is read from the refresh task's snapshot slot at render and
//!   play time; nothing signals the loop when it changes.

use std::future::Future;
use std::io;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use radio_core::playback::{MediaEngine, PlaybackController, PlaybackState};
use radio_core::refresh::CatalogReader;

use crate::keymap::{Action, KeyMap};
use crate::screen;

/// How the program ended. Only a failed first connection is unclean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Interrupted,
    /// The station directory could not be reached at startup.
    ConnectionFailed,
}

pub struct App<E> {
    controller: PlaybackController<E>,
    catalog: CatalogReader,
    keys: KeyMap,
}

impl<E: MediaEngine> App<E> {
    pub fn new(engine: E, catalog: CatalogReader) -> Self {
        Self {
            controller: PlaybackController::new(engine),
            catalog,
            keys: KeyMap::new(),
        }
    }

    pub fn playback(&self) -> &PlaybackState {
        self.controller.state()
    }

    pub fn engine_mut(&mut self) -> &mut E {
        self.controller.engine_mut()
    }

    /// Draw the current catalog snapshot and playback state. Draw failures
    /// are logged and otherwise ignored.
    pub fn render<B: Backend>(&self, terminal: &mut Terminal<B>) {
        let catalog = self.catalog.snapshot();
        let state = self.controller.state();
        if let Err(e) = terminal.draw(|f| screen::draw(f, &catalog, state, &self.keys)) {
            warn!("render failed: {}", e);
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<ControlFlow<Exit>> {
        let action = self.keys.action_for(key);
        debug!("key {:?} -> {:?}", key.code, action);
        self.apply(action).await
    }

    /// Engine errors propagate; they end the program.
    pub async fn apply(&mut self, action: Action) -> anyhow::Result<ControlFlow<Exit>> {
        match action {
            Action::Quit => return Ok(ControlFlow::Break(Exit::Quit)),
            Action::Interrupt => return Ok(ControlFlow::Break(Exit::Interrupted)),
            Action::Volume(delta) => {
                self.controller.adjust_volume(delta).await?;
            }
            Action::TogglePause => self.controller.toggle_play_pause().await?,
            Action::Play(index) => {
                let catalog = self.catalog.snapshot();
                self.controller.play(index, &catalog).await?;
            }
            Action::Noop => {}
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Run until quit, interrupt, or an error. Expects the first frame to
    /// have been drawn already. `interrupt` is polled across iterations, so a
    /// signal that lands while a key is being handled is seen on the next pass.
    pub async fn run<B, I>(
        &mut self,
        terminal: &mut Terminal<B>,
        mut events: mpsc::Receiver<Event>,
        mut interrupt: Pin<&mut I>,
    ) -> anyhow::Result<Exit>
    where
        B: Backend,
        I: Future<Output = io::Result<()>>,
    {
        loop {
            tokio::select! {
                ev = events.recv() => {
                    let Some(ev) = ev else {
                        anyhow::bail!("terminal input closed");
                    };
                    match ev {
                        Event::Key(key) if key.kind != KeyEventKind::Release => {
                            if let ControlFlow::Break(exit) = self.handle_key(key).await? {
                                info!("leaving main loop: {:?}", exit);
                                return Ok(exit);
                            }
                            self.render(terminal);
                        }
                        Event::Resize(w, h) => {
                            debug!("resize {}x{}", w, h);
                            self.render(terminal);
                        }
                        _ => {}
                    }
                }
                res = interrupt.as_mut() => {
                    res?;
                    info!("interrupt signal received");
                    return Ok(Exit::Interrupted);
                }
            }
        }
    }
}

// ── Terminal input ────────────────────────────────────────────────────────────

/// Forward terminal events from a blocking reader. The reader stops shortly
/// after the receiver is dropped.
pub fn spawn_event_reader() -> mpsc::Receiver<Event> {
    let (tx, rx) = mpsc::channel::<Event>(64);
    tokio::task::spawn_blocking(move || {
        while !tx.is_closed() {
            match event::poll(Duration::from_millis(100)) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    warn!("event poll failed: {}", e);
                    break;
                }
            }
            match event::read() {
                Ok(ev) => {
                    if tx.blocking_send(ev).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("event read failed: {}", e);
                    break;
                }
            }
        }
        debug!("event reader: exiting");
    });
    rx
}

// ── Terminal session ──────────────────────────────────────────────────────────

/// Raw mode + alternate screen for as long as this lives. Dropping it (on
/// any exit path, errors included) puts the terminal back.
pub struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    restored: bool,
}

impl TerminalSession {
    pub fn enter() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(t) => t,
            Err(e) => {
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                let _ = disable_raw_mode();
                return Err(e.into());
            }
        };
        debug!("terminal session started");
        Ok(Self {
            terminal,
            restored: false,
        })
    }

    pub fn terminal(&mut self) -> &mut Terminal<CrosstermBackend<io::Stdout>> {
        &mut self.terminal
    }

    pub fn restore(&mut self) -> anyhow::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        debug!("terminal restored");
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("terminal restore failed: {}", e);
        }
    }
}
