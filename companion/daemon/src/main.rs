//! Companion Daemon - Headless Fluffel
//!
//! Runs the companion's coordination loop without a window. Commands are read
//! line by line from stdin and every render command is written to stdout, so
//! the daemon can be scripted or driven by another process.
//!
//! # Usage
//!
//! ```bash
//! # Interactive, human-readable output
//! companion-daemon
//!
//! # JSON lines for a driving process
//! companion-daemon --json < script.txt
//!
//! # Custom config and track list
//! companion-daemon --config ./companion.toml --tracks a.mp3,b.mp3
//!
//! # Verbose logging (always on stderr)
//! RUST_LOG=debug companion-daemon
//! ```
//!
//! Type `help` for the command list.
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown (active speech and music are
//!   cancelled)

mod commands;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use companion_core::backend::SharedWindows;
use companion_core::prefs::{default_preferences_path, JsonFilePreferences};
use companion_core::{
    config, ConfigOverrides, Coordinator, CoordinatorHandle, DispatchError, Preferences, Rect,
    RenderCommand, Services, WindowId, WindowInfo,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use commands::Command;
use output::Format;

/// Companion Daemon - Headless Fluffel driven from stdin
#[derive(Parser, Debug)]
#[command(name = "companion-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "FLUFFEL_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write render commands as JSON lines
    #[arg(long)]
    json: bool,

    /// Screen width in pixels
    #[arg(long, default_value_t = 1920.0, value_name = "PX")]
    screen_width: f64,

    /// Screen height in pixels
    #[arg(long, default_value_t = 1080.0, value_name = "PX")]
    screen_height: f64,

    /// Preference file (voice, API key)
    #[arg(short = 'p', long, env = "FLUFFEL_PREFS", value_name = "FILE")]
    prefs: Option<PathBuf>,

    /// Keep preferences in memory only
    #[arg(long, conflicts_with = "prefs")]
    ephemeral: bool,

    /// Track list (comma separated)
    #[arg(short = 't', long, value_delimiter = ',', value_name = "URI")]
    tracks: Vec<String>,

    /// Local fallback track
    #[arg(short = 'f', long, value_name = "PATH")]
    fallback: Option<PathBuf>,

    /// Text-to-speech endpoint
    #[arg(long, value_name = "URL")]
    tts_endpoint: Option<String>,

    /// Idle seconds before dozing off
    #[arg(long, value_name = "SECS")]
    sleep_after: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "FLUFFEL_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref endpoint) = self.tts_endpoint {
            overrides = overrides.with_tts_endpoint(endpoint.clone());
        }
        if !self.tracks.is_empty() {
            overrides = overrides.with_tracks(self.tracks.clone());
        }
        if let Some(ref fallback) = self.fallback {
            overrides = overrides.with_fallback_track(fallback.display().to_string());
        }
        if let Some(secs) = self.sleep_after {
            overrides = overrides.with_sleep_after_secs(secs);
        }
        overrides
    }
}

/// Initialize logging with the specified level
///
/// Logs go to stderr; stdout belongs to the render output.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "companion_daemon={level},companion_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .init();
}

fn open_preferences(args: &Args) -> Result<Preferences> {
    if args.ephemeral {
        return Ok(Preferences::in_memory());
    }
    let Some(path) = args.prefs.clone().or_else(default_preferences_path) else {
        warn!("No config directory; preferences will not persist");
        return Ok(Preferences::in_memory());
    };
    let store = JsonFilePreferences::open(&path)
        .with_context(|| format!("Failed to open preferences: {path:?}"))?;
    info!(path = ?path, "Preferences");
    Ok(Preferences::new(Arc::new(store)))
}

/// Print render commands until the coordinator hangs up
async fn render_loop(mut rx: mpsc::UnboundedReceiver<RenderCommand>, format: Format) {
    while let Some(command) = rx.recv().await {
        match format.command(&command) {
            Ok(line) => println!("{line}"),
            Err(e) => error!(error = %e, command = command.label(), "Failed to encode"),
        }
    }
}

/// Everything a stdin command can touch
struct Session {
    handle: CoordinatorHandle,
    windows: Arc<SharedWindows>,
    preferences: Preferences,
    format: Format,
}

impl Session {
    /// Run one command; `false` ends the session
    async fn execute(&self, command: Command) -> bool {
        match command {
            Command::Press(direction) => self.handle.press(direction),
            Command::Release(direction) => self.handle.release(direction),
            Command::Menu(action) => {
                let name = action.name();
                match self.handle.dispatch(action).await {
                    Ok(()) => true,
                    Err(DispatchError::Busy(_)) => {
                        eprintln!("busy: {name} ignored");
                        true
                    }
                    Err(DispatchError::Closed) => false,
                }
            }
            Command::Play(uri) => {
                let shown = uri.clone();
                self.handle.play(
                    uri,
                    Some(Box::new(move |started: bool| {
                        info!(uri = %shown, started, "Playback request finished");
                    })),
                )
            }
            Command::WindowAdd { id, rect } => {
                self.windows.upsert(WindowInfo::new(id, rect));
                self.handle.windows_changed()
            }
            Command::WindowRemove(id) => {
                if !self.windows.remove(WindowId(id)) {
                    eprintln!("no window {id}");
                    return true;
                }
                self.handle.windows_changed()
            }
            Command::Drag(origin) => self.handle.drag_to(origin),
            Command::ApiKey(key) => {
                if let Err(e) = self.preferences.set_api_key(key) {
                    error!(error = %e, "Failed to store API key");
                }
                true
            }
            Command::Cancel => self.handle.cancel_speech(),
            Command::Snapshot => {
                let Some(snapshot) = self.handle.snapshot().await else {
                    return false;
                };
                match self.format.snapshot(&snapshot) {
                    Ok(line) => println!("{line}"),
                    Err(e) => error!(error = %e, "Failed to encode snapshot"),
                }
                true
            }
            Command::Help => {
                eprintln!("{}", commands::HELP);
                true
            }
            Command::Quit => false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("Companion Daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config =
        config::load_config_from_path(args.config.clone()).context("Failed to load config")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;
    info!(source = %config.source(), tracks = config.tracks.len(), "Configuration loaded");

    let preferences = open_preferences(&args)?;
    let windows = Arc::new(SharedWindows::new(Rect::new(
        0.0,
        0.0,
        args.screen_width,
        args.screen_height,
    )));
    let services = Services::standard(&config, windows.clone(), preferences.clone());

    let format = Format::from_json_flag(args.json);
    let (render_tx, render_rx) = mpsc::unbounded_channel();
    let (coordinator, handle) = Coordinator::new(config, services, render_tx);

    let renderer = tokio::spawn(render_loop(render_rx, format));
    let coordinator = tokio::spawn(coordinator.run());

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    let session = Session {
        handle,
        windows,
        preferences,
        format,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() || line.trim_start().starts_with('#') {
                        continue;
                    }
                    match Command::parse(&line) {
                        Ok(command) => {
                            if !session.execute(command).await {
                                break;
                            }
                        }
                        Err(e) => eprintln!("{e}"),
                    }
                }
                Ok(None) => {
                    info!("stdin closed");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to read stdin");
                    break;
                }
            },
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating shutdown");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating shutdown");
                break;
            }
        }
    }

    info!("Shutting down...");
    session.handle.shutdown();
    if let Err(e) = coordinator.await {
        error!(error = %e, "Coordinator task failed");
    }
    drop(session);
    if let Err(e) = renderer.await {
        error!(error = %e, "Renderer task failed");
    }

    info!("Companion Daemon stopped");
    Ok(())
}
