//! Companion Core - Headless Behavior Coordination for Fluffel
//!
//! This crate decides what the desktop companion does: how it walks, when it
//! grabs onto a window edge or falls off one, what it says and which song it
//! plays. It draws nothing. A renderer (the terminal playground, the headless
//! daemon, a native overlay) receives typed [`RenderCommand`]s and draws them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Surfaces                                 │
//! │   ┌──────────────┐   ┌──────────────┐   ┌─────────────────────┐  │
//! │   │ fluffel-tui  │   │    daemon    │   │  tests / headless   │  │
//! │   └──────┬───────┘   └──────┬───────┘   └──────────┬──────────┘  │
//! │          └──────────────────┴──────────────────────┘             │
//! │                 CoordinatorEvent (up)  RenderCommand (down)      │
//! └─────────────────────────────┼────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────┼────────────────────────────────────┐
//! │                      COMPANION CORE                              │
//! │  ┌──────────────────────────┴───────────────────────────────┐    │
//! │  │                      Coordinator                          │    │
//! │  │  ┌────────────┐ ┌──────────┐ ┌──────────┐ ┌────────────┐  │    │
//! │  │  │  Behavior  │ │  Action  │ │  Speech  │ │   Media    │  │    │
//! │  │  │  Machine   │ │   Gate   │ │ Sessions │ │  Sessions  │  │    │
//! │  │  └─────┬──────┘ └──────────┘ └────┬─────┘ └─────┬──────┘  │    │
//! │  │        │ EdgeScanner              │ TTS          │ player  │    │
//! │  └────────┼──────────────────────────┼──────────────┼─────────┘    │
//! │           ▼                          ▼              ▼              │
//! │      WindowSource          SpeechSynthesizer   MediaPlayer         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Coordinator`]: the single task that owns all character state
//! - [`CoordinatorHandle`]: cloneable sender for input and requests
//! - [`BehaviorStateMachine`]: locomotion, facing, animation tracks
//! - [`EdgeScanner`]: nearest window edge within a tolerance
//! - [`ActionGate`]: single-flight gate with cooldown for menu actions
//! - [`SpeechManager`] / [`MediaManager`]: token-guarded sessions
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use companion_core::{
//!     backend::SharedWindows, config, geometry::Rect, prefs::Preferences,
//!     Coordinator, Services,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = config::load_config()?;
//!     let windows = Arc::new(SharedWindows::new(Rect::new(0.0, 0.0, 1920.0, 1080.0)));
//!     let services = Services::standard(&config, windows, Preferences::in_memory());
//!
//!     let (render_tx, mut render_rx) = mpsc::unbounded_channel();
//!     let (coordinator, handle) = Coordinator::new(config, services, render_tx);
//!     tokio::spawn(coordinator.run());
//!
//!     handle.menu(companion_core::MenuAction::TellJoke);
//!     while let Some(command) = render_rx.recv().await {
//!         println!("{}", command.label());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: collaborator traits and the shipped implementations
//! - [`behavior`]: locomotion states and the behavior state machine
//! - [`config`]: TOML + environment configuration
//! - [`coordinator`]: the coordination loop
//! - [`edge`]: window edge detection
//! - [`events`]: input to the coordination loop
//! - [`gate`]: the action gate
//! - [`geometry`]: points and rectangles
//! - [`media`]: media sessions
//! - [`messages`]: render commands
//! - [`prefs`]: persisted preferences
//! - [`speech`]: speech sessions, voices, dialogue, conversations
//! - [`timers`]: the coordinator's deadline queue

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod behavior;
pub mod config;
pub mod coordinator;
pub mod edge;
pub mod events;
pub mod gate;
pub mod geometry;
pub mod media;
pub mod messages;
pub mod prefs;
pub mod speech;
pub mod timers;

// Re-exports for convenience
pub use behavior::{
    AnimationTrack, BehaviorStateMachine, BehaviorTuning, CharacterSnapshot, Direction,
    Expression, Facing, LocomotionState, StateError,
};
pub use config::{load_config, CompanionConfig, ConfigError, ConfigOverrides, ConfigSource};
pub use coordinator::{Coordinator, CoordinatorHandle, Services};
pub use edge::{EdgeBinding, EdgeHit, EdgeScanner, EdgeType, WindowId, WindowInfo};
pub use events::{CoordinatorEvent, DispatchError, KeyPhase, MenuAction};
pub use gate::{ActionGate, Busy};
pub use geometry::{Point, Rect, Size};
pub use media::{MediaError, MediaManager, MediaSource, MediaToken};
pub use messages::RenderCommand;
pub use prefs::Preferences;
pub use speech::{SpeechError, SpeechManager, SpeechOutcome, SpeechToken, VoiceType};
