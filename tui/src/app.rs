//! Main Application
//!
//! The App is a thin renderer around the companion core:
//! - Converts terminal events into coordinator input (keys, menu actions,
//!   drags, window edits)
//! - Applies the coordinator's [`RenderCommand`]s to the [`Scene`]
//! - Draws the scene at a fixed frame rate
//!
//! Windows on the playground desktop are boxes the user adds and removes;
//! the character can walk along their edges and fall off them.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{
    Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use futures::StreamExt;
use rand::Rng;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use companion_core::backend::SharedWindows;
use companion_core::{
    CompanionConfig, Coordinator, CoordinatorHandle, Direction, DispatchError, MenuAction,
    Preferences, Rect as WorldRect, RenderCommand, Services, VoiceType, WindowId, WindowInfo,
};

use crate::keys::KeyTracker;
use crate::scene::Scene;
use crate::view::{self, FrameView, Viewport};

/// Target ~12 FPS for the sprite animations
const FRAME_DURATION: Duration = Duration::from_millis(80);

/// Frames per sprite animation step
const FRAMES_PER_STEP: u64 = 3;

/// How long a local status message stays up
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Main application state
pub struct App {
    // === Core State ===
    /// Is the app still running?
    running: bool,

    // === Companion Integration ===
    /// Sender into the coordination loop
    handle: CoordinatorHandle,
    /// The coordination loop task
    coordinator: Option<JoinHandle<()>>,
    /// Render commands from the coordinator
    render_rx: mpsc::UnboundedReceiver<RenderCommand>,
    /// The playground's window list
    windows: Arc<SharedWindows>,
    /// Windows added by the user, newest last
    window_stack: Vec<WindowId>,
    next_window_id: u64,

    // === Rendering State ===
    scene: Scene,
    viewport: Viewport,
    frame: u64,
    status: Option<(String, Instant)>,

    // === Input State ===
    keys: KeyTracker,
    /// The terminal reports key releases
    real_releases: bool,
}

impl App {
    /// Create a new App and start the coordinator
    pub fn new(
        config: CompanionConfig,
        preferences: Preferences,
        real_releases: bool,
    ) -> anyhow::Result<Self> {
        let (cols, rows) = crossterm::terminal::size()?;
        let viewport = Viewport::new(cols, rows);
        let windows = Arc::new(SharedWindows::new(viewport.screen()));

        let services = Services::standard(&config, windows.clone(), preferences);
        let (render_tx, render_rx) = mpsc::unbounded_channel();
        let (coordinator, handle) = Coordinator::new(config, services, render_tx);
        let coordinator = tokio::spawn(coordinator.run());

        tracing::info!(cols, rows, real_releases, "Playground started");

        Ok(Self {
            running: true,
            handle,
            coordinator: Some(coordinator),
            render_rx,
            windows,
            window_stack: Vec::new(),
            next_window_id: 1,
            scene: Scene::new(),
            viewport,
            frame: 0,
            status: None,
            keys: KeyTracker::new(),
            real_releases,
        })
    }

    /// Run the main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();
        let mut ticker = tokio::time::interval(FRAME_DURATION);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        self.render(terminal)?;

        while self.running {
            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(event)) => self.handle_event(event).await,
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Terminal event stream failed");
                        self.running = false;
                    }
                    None => self.running = false,
                },

                command = self.render_rx.recv() => match command {
                    Some(command) => self.scene.apply(command, Instant::now()),
                    None => {
                        tracing::warn!("Coordinator stopped");
                        self.running = false;
                    }
                },

                _ = ticker.tick() => {
                    self.frame += 1;
                }
            }

            // Batch whatever else arrived before drawing
            while let Ok(command) = self.render_rx.try_recv() {
                self.scene.apply(command, Instant::now());
            }

            self.update();
            self.render(terminal)?;
        }

        self.shutdown().await;
        Ok(())
    }

    fn update(&mut self) {
        let now = Instant::now();
        if !self.real_releases {
            for dir in self.keys.expire(now) {
                self.handle.release(dir);
            }
        }
        self.scene.tick(now);
        if self.status.as_ref().is_some_and(|(_, until)| now >= *until) {
            self.status = None;
        }
    }

    fn render(&self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        let windows = self.windows.all();
        let view = FrameView {
            viewport: self.viewport,
            scene: &self.scene,
            position: self.scene.position_at(Instant::now()),
            windows: &windows,
            frame: self.frame / FRAMES_PER_STEP,
            status: self.status.as_ref().map(|(s, _)| s.as_str()),
        };
        terminal.draw(|f| view::draw(f, &view))?;
        Ok(())
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key).await,
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(cols, rows) => self.handle_resize(cols, rows),
            _ => {}
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if let Some(dir) = arrow(key.code) {
            match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => {
                    if self.keys.press(dir, Instant::now()) {
                        self.handle.press(dir);
                    }
                }
                KeyEventKind::Release => {
                    if self.keys.release(dir) {
                        self.handle.release(dir);
                    }
                }
            }
            return;
        }

        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.running = false;
            }
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('n') => self.add_window(),
            KeyCode::Char('x') => self.close_window(),
            KeyCode::Char(c) => {
                if let Some(action) = menu_key(c) {
                    self.dispatch(action).await;
                }
            }
            _ => {}
        }
    }

    async fn dispatch(&mut self, action: MenuAction) {
        let name = action.name();
        match self.handle.dispatch(action).await {
            Ok(()) => tracing::debug!(action = name, "Menu action accepted"),
            Err(DispatchError::Busy(_)) => self.set_status(format!("busy, {name} ignored")),
            Err(DispatchError::Closed) => self.running = false,
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if let MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) =
            mouse.kind
        {
            self.handle
                .drag_to(self.viewport.to_world(mouse.column, mouse.row));
        }
    }

    fn handle_resize(&mut self, cols: u16, rows: u16) {
        self.viewport = Viewport::new(cols, rows);
        self.windows.set_screen(self.viewport.screen());
        self.handle.windows_changed();
    }

    /// Drop a randomly sized window somewhere on the desktop
    fn add_window(&mut self) {
        let screen = self.viewport.screen();
        if screen.width < 64.0 || screen.height < 64.0 {
            return;
        }
        let mut rng = rand::thread_rng();
        let width = (screen.width * rng.gen_range(0.2..0.45)).round();
        let height = (screen.height * rng.gen_range(0.2..0.45)).round();
        let x = (rng.gen_range(0.0..(screen.width - width)) / view::CELL_WIDTH).floor()
            * view::CELL_WIDTH;
        let y = (rng.gen_range(0.0..(screen.height - height)) / view::CELL_HEIGHT).floor()
            * view::CELL_HEIGHT;

        let id = self.next_window_id;
        self.next_window_id += 1;
        self.windows
            .upsert(WindowInfo::new(id, WorldRect::new(x, y, width, height)));
        self.window_stack.push(WindowId(id));
        self.handle.windows_changed();
        tracing::debug!(id, x, y, width, height, "Window added");
    }

    /// Close the newest window
    fn close_window(&mut self) {
        if let Some(id) = self.window_stack.pop() {
            self.windows.remove(id);
            self.handle.windows_changed();
            tracing::debug!(%id, "Window closed");
        }
    }

    fn set_status(&mut self, text: String) {
        self.status = Some((text, Instant::now() + STATUS_TTL));
    }

    async fn shutdown(&mut self) {
        self.handle.shutdown();
        if let Some(task) = self.coordinator.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Coordinator task failed");
            }
        }
        tracing::info!("Playground stopped");
    }
}

fn arrow(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up => Some(Direction::Up),
        KeyCode::Down => Some(Direction::Down),
        KeyCode::Left => Some(Direction::Left),
        KeyCode::Right => Some(Direction::Right),
        _ => None,
    }
}

/// Menu shortcut keys
fn menu_key(c: char) -> Option<MenuAction> {
    let action = match c {
        'g' => MenuAction::SpeakGreeting,
        'j' => MenuAction::TellJoke,
        'f' => MenuAction::ShareFact,
        'c' => MenuAction::StartConversation,
        'p' => MenuAction::PlayTrack,
        's' => MenuAction::StopMusic,
        'r' => MenuAction::ResetPosition,
        'd' => MenuAction::Dance,
        'z' => MenuAction::Sleep,
        '1'..='6' => {
            let index = i64::from(u32::from(c) - u32::from('1'));
            MenuAction::SetVoice(VoiceType::from_index(index)?)
        }
        _ => return None,
    };
    Some(action)
}
