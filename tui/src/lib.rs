//! Fluffel TUI - Terminal playground for the desktop companion
//!
//! A full-screen terminal stand-in for the desktop: windows are boxes you
//! add and remove, and Fluffel walks, climbs, falls, talks and dances among
//! them, driven by the same coordination core as the real overlay.
//!
//! # Architecture
//!
//! - **App**: event loop; terminal input in, render commands out
//! - **Scene**: renderer-side state rebuilt from render commands
//! - **Keys**: press/release pairs from terminals that only repeat
//! - **View**: pixel to cell mapping and drawing

pub mod app;
pub mod keys;
pub mod scene;
pub mod sprite;
pub mod theme;
pub mod view;

pub use app::App;
