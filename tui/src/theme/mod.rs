//! Theme and Colors
//!
//! Fluffel's palette for the terminal playground.

use ratatui::style::Color;

use companion_core::Expression;

// ============================================================================
// Fluffel Palette
// ============================================================================

/// Fur - warm cream (main color)
pub const FUR: Color = Color::Rgb(250, 228, 190);

/// Fur while asleep - dimmed
pub const FUR_SLEEPY: Color = Color::Rgb(180, 165, 140);

/// Fur while falling - alarmed orange
pub const FUR_STARTLED: Color = Color::Rgb(255, 170, 90);

/// Fur while dancing or listening - party pink
pub const FUR_PARTY: Color = Color::Rgb(255, 150, 210);

// ============================================================================
// UI Colors
// ============================================================================

/// Window frames
pub const WINDOW_FRAME: Color = Color::Rgb(110, 140, 200);

/// Speech bubble text
pub const BUBBLE_TEXT: Color = Color::Rgb(240, 240, 240);

/// Speech bubble frame
pub const BUBBLE_FRAME: Color = Color::Rgb(200, 230, 255);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Notices
pub const NOTICE_YELLOW: Color = Color::Rgb(255, 223, 128);

/// Fur color for a face
#[must_use]
pub fn fur_for(expression: Expression) -> Color {
    match expression {
        Expression::Asleep => FUR_SLEEPY,
        Expression::Startled => FUR_STARTLED,
        Expression::Blissful | Expression::Joyful => FUR_PARTY,
        _ => FUR,
    }
}
