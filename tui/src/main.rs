//! Fluffel TUI Entry Point
//!
//! Launches the terminal playground for Fluffel.
//!
//! Usage:
//!   fluffel-tui
//!
//! Configuration comes from `~/.config/fluffel/companion.toml` and the
//! `FLUFFEL_*` environment variables. Logs go to
//! `~/.cache/fluffel/tui.log` (filter with `RUST_LOG`).

use std::fs::{self, OpenOptions};
use std::io;
use std::panic;
use std::sync::{Arc, Mutex};

use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use companion_core::prefs::{default_preferences_path, JsonFilePreferences};
use companion_core::{load_config, Preferences};
use fluffel_tui::App;

/// Log to a file; the terminal belongs to the UI
fn init_logging() {
    let Some(dir) = dirs::cache_dir().map(|d| d.join("fluffel")) else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("tui.log"))
    else {
        return;
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("fluffel_tui=info,companion_core=info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();
}

fn open_preferences() -> Preferences {
    let Some(path) = default_preferences_path() else {
        return Preferences::in_memory();
    };
    match JsonFilePreferences::open(&path) {
        Ok(store) => Preferences::new(Arc::new(store)),
        Err(e) => {
            tracing::warn!(error = %e, "Preferences unavailable; using memory");
            Preferences::in_memory()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: fluffel-tui requires a terminal (TTY)");
        eprintln!();
        eprintln!("For scripted or piped use, run companion-daemon instead.");
        std::process::exit(1);
    }

    let config = load_config()?;
    let preferences = open_preferences();

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    // Real key releases where the terminal can report them
    let real_releases = supports_keyboard_enhancement().unwrap_or(false);
    if real_releases {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app
    let result = match App::new(config, preferences, real_releases) {
        Ok(mut app) => app.run(&mut terminal).await,
        Err(e) => Err(e),
    };

    // Restore terminal
    if real_releases {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}
