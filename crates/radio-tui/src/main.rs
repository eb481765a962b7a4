mod app;
mod keymap;
mod mpv;
mod screen;
mod startup;
mod theme;

use std::ops::ControlFlow;
use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info, warn};

use radio_core::catalog::CatalogFetcher;
use radio_core::config::Config;
use radio_core::refresh::{catalog_channel, spawn_refresh_task};

use crate::app::{App, Exit, TerminalSession};
use crate::mpv::MpvEngine;
use crate::startup::{exit_status, initial_catalog, or_interrupt};

#[tokio::main]
async fn main() -> ExitCode {
    let result = run().await;
    match &result {
        Ok(Exit::ConnectionFailed) => eprintln!("Connection Error"),
        Ok(_) => {}
        Err(e) => {
            error!("fatal: {:#}", e);
            eprintln!("ERROR: {:#}", e);
        }
    }
    ExitCode::from(exit_status(&result))
}

fn init_logging() -> anyhow::Result<()> {
    let data_dir = radio_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let log_path = data_dir.join("craft-radio.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    // Allow RUST_LOG override; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "info,craft_radio=debug,radio_core=debug,hyper_util=warn,reqwest=warn,hyper=warn"
            .to_string()
    });
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // stdout belongs to the UI; tell the operator where the log went.
    eprintln!("craft-radio log: {}", log_path.display());
    Ok(())
}

async fn run() -> anyhow::Result<Exit> {
    init_logging()?;
    info!("craft-radio starting…");

    // One handler for the whole run: installed before the first slow step and
    // polled by the UI loop afterwards.
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("ignoring unreadable {:?}: {:#}", Config::config_path(), e);
            Config::default()
        }
    };

    // ── Initial station list ─────────────────────────────────────────────────
    println!("Loading stations...");
    let fetcher = CatalogFetcher::new(
        config.catalog.url.clone(),
        config.catalog.request_timeout(),
    )?;
    let initial = match or_interrupt(initial_catalog(&fetcher), interrupt.as_mut()).await? {
        ControlFlow::Continue(catalog) => catalog,
        ControlFlow::Break(exit) => return Ok(exit),
    };
    info!("loaded {} stations from {}", initial.len(), fetcher.url());
    let (catalog_tx, catalog) = catalog_channel(initial);

    // ── Media engine ─────────────────────────────────────────────────────────
    let start = async {
        let engine = MpvEngine::start(config.mpv.initial_volume).await?;
        Ok::<_, anyhow::Error>(ControlFlow::Continue(engine))
    };
    let engine = match or_interrupt(start, interrupt.as_mut()).await? {
        ControlFlow::Continue(engine) => engine,
        ControlFlow::Break(exit) => return Ok(exit),
    };
    let mut app = App::new(engine, catalog);

    // ── UI ───────────────────────────────────────────────────────────────────
    let mut session = TerminalSession::enter()?;
    let events = app::spawn_event_reader();
    app.render(session.terminal());

    let refresh = spawn_refresh_task(fetcher, config.catalog.refresh_interval(), catalog_tx);

    let result = app
        .run(session.terminal(), events, interrupt.as_mut())
        .await;

    // ── Teardown ─────────────────────────────────────────────────────────────
    refresh.abort();
    session.restore()?;
    app.engine_mut().shutdown().await;

    let exit = result?;
    info!(
        "craft-radio exiting ({:?}, last status {:?})",
        exit,
        app.playback().status
    );
    Ok(exit)
}
