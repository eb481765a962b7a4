/// mpv IPC driver with separated reader/writer tasks.
///
/// Architecture:
///
/// ```text
///   MpvDriver::spawn_and_connect()
///         │
///         ├── writer_task   ← receives PendingRequest via mpsc, serialises → socket
///         └── reader_task   ← reads JSON lines from socket
///                                ├── response (has request_id) → matched oneshot::Sender
///                                └── event                     → logged
/// ```
///
/// `MpvEngine` wraps a driver and its handle and implements the
/// `MediaEngine` operations the playback controller needs.
///
/// Platform notes:
/// - Unix:   Unix domain sockets
/// - Windows: Named pipes  \\.\pipe\<name>
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use radio_core::playback::{Media, MediaEngine};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

const IPC_TIMEOUT: Duration = Duration::from_secs(5);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String, // serialised JSON line (already has '\n')
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

// ── public handle ─────────────────────────────────────────────────────────────

/// Cloneable handle to the mpv writer task.  Use `send()` to fire a command
/// and await the response.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(IPC_TIMEOUT, reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    pub async fn load_stream(&self, url: &str) -> anyhow::Result<()> {
        debug!("mpv: loadfile url={}", url);
        self.send(json!(["loadfile", url, "replace"])).await?;
        Ok(())
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(json!(["stop"])).await?;
        Ok(())
    }

    pub async fn get_volume(&self) -> anyhow::Result<u8> {
        let resp = self.send(json!(["get_property", "volume"])).await?;
        let vol = resp["data"]
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("mpv volume is not a number: {}", resp["data"]))?;
        Ok(vol.round().clamp(0.0, 100.0) as u8)
    }

    pub async fn set_volume(&self, percent: u8) -> anyhow::Result<()> {
        self.send(json!(["set_property", "volume", percent.min(100)]))
            .await?;
        Ok(())
    }
}

// ── driver ────────────────────────────────────────────────────────────────────

/// Owns the mpv child process. The process is killed when the driver is
/// dropped.
pub struct MpvDriver {
    pub socket_name: String,
    process: Option<tokio::process::Child>,
    initial_volume: u8,
}

impl MpvDriver {
    pub fn new(initial_volume: u8) -> Self {
        Self {
            socket_name: radio_core::platform::mpv_socket_name(),
            process: None,
            initial_volume: initial_volume.min(100),
        }
    }

    /// Kill the process if running.
    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
            info!("mpv: process killed");
        }
        #[cfg(unix)]
        let _ = tokio::fs::remove_file(&self.socket_name).await;
    }

    fn command(&self) -> anyhow::Result<tokio::process::Command> {
        let mpv_binary = radio_core::platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found (install mpv or put it on PATH)"))?;

        // mpv writes its own diagnostics here; the terminal belongs to the UI.
        let stderr_path = radio_core::platform::data_dir().join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;
        info!("mpv: logging stderr to {:?}", stderr_path);

        let mut cmd = tokio::process::Command::new(&mpv_binary);
        cmd.arg("--no-video")
            .arg("--idle=yes")
            .arg("--no-terminal")
            .arg(radio_core::platform::mpv_socket_arg(&self.socket_name))
            .arg("--quiet")
            .arg(format!("--volume={}", self.initial_volume))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(stderr_file)
            .kill_on_drop(true);
        Ok(cmd)
    }

    #[cfg(unix)]
    pub async fn spawn_and_connect(&mut self) -> anyhow::Result<MpvHandle> {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }

        let socket_path = std::path::PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;

        info!("mpv: spawning new process");
        let child = self.command()?.spawn()?;
        info!("mpv: spawned process with pid {:?}", child.id());
        self.process = Some(child);

        // Wait for socket to appear
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket");
        let (read_half, write_half) = stream.into_split();
        Ok(start_io_tasks(BufReader::new(read_half), write_half))
    }

    #[cfg(windows)]
    pub async fn spawn_and_connect(&mut self) -> anyhow::Result<MpvHandle> {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }

        info!("mpv: spawning new process");
        let child = self.command()?.spawn()?;
        self.process = Some(child);

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to named pipe");
                let (read_half, write_half) = tokio::io::split(client);
                return Ok(start_io_tasks(BufReader::new(read_half), write_half));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }
}

fn start_io_tasks<R, W>(reader: BufReader<R>, writer: W) -> MpvHandle
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    // req_id → reply channel.  Writer inserts, reader resolves.
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

    tokio::spawn(writer_task(writer, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(reader, pending));

    MpvHandle { tx: cmd_tx }
}

// ── reader task ───────────────────────────────────────────────────────────────

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_pending(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(val) => route_line(val, &pending).await,
                    Err(e) => debug!("mpv reader: invalid json '{}': {}", trimmed, e),
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_pending(&pending, &format!("mpv IPC read error: {}", e)).await;
                break;
            }
        }
    }
}

async fn route_line(val: Value, pending: &PendingMap) {
    let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) else {
        log_event(&val);
        return;
    };
    let Some(tx) = pending.lock().await.remove(&req_id) else {
        debug!("mpv reader: response for unknown req={}", req_id);
        return;
    };
    let _ = tx.send(response_result(val));
}

/// mpv answers every command with `"error": "success"` or an error string.
fn response_result(val: Value) -> anyhow::Result<Value> {
    match val["error"].as_str() {
        Some("success") => Ok(val),
        other => Err(anyhow::anyhow!("mpv error: {}", other.unwrap_or("unknown error"))),
    }
}

fn log_event(val: &Value) {
    match val.get("event").and_then(|e| e.as_str()) {
        Some("end-file") if val["reason"].as_str() == Some("error") => {
            warn!(
                "mpv: stream ended with error: {}",
                val["file_error"].as_str().unwrap_or("unknown")
            );
        }
        Some(name) => debug!("mpv reader: event {}", name),
        None => debug!("mpv reader: unsolicited line {}", val),
    }
}

async fn fail_pending(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

// ── writer task ───────────────────────────────────────────────────────────────

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register reply channel before writing so reader can match it
        pending.lock().await.insert(req.req_id, req.reply);
        debug!(
            "mpv writer: send req={} payload={}",
            req.req_id,
            req.payload.trim()
        );
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── MediaEngine ───────────────────────────────────────────────────────────────

/// mpv as the playback controller's media engine. `load` only remembers the
/// stream; `play` (re)issues `loadfile` for it, so resuming after a stop
/// reconnects to the live stream.
pub struct MpvEngine {
    driver: MpvDriver,
    handle: MpvHandle,
    loaded: Option<Media>,
}

impl MpvEngine {
    pub async fn start(initial_volume: u8) -> anyhow::Result<Self> {
        let mut driver = MpvDriver::new(initial_volume);
        let handle = driver.spawn_and_connect().await?;
        Ok(Self {
            driver,
            handle,
            loaded: None,
        })
    }

    pub async fn shutdown(&mut self) {
        let _ = self.handle.send(json!(["quit"])).await;
        self.driver.kill().await;
    }
}

impl MediaEngine for MpvEngine {
    async fn load(&mut self, media: Media) -> anyhow::Result<()> {
        self.loaded = Some(media);
        Ok(())
    }

    async fn play(&mut self) -> anyhow::Result<()> {
        let media = self
            .loaded
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("mpv: play requested with no media loaded"))?;
        self.handle.load_stream(&media.url).await
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.handle.stop().await
    }

    async fn volume(&mut self) -> anyhow::Result<u8> {
        self.handle.get_volume().await
    }

    async fn set_volume(&mut self, percent: u8) -> anyhow::Result<()> {
        self.handle.set_volume(percent).await
    }
}
