//! Window Edge Scanner
//!
//! Finds the window edge nearest to a point so the character can walk along
//! the borders of other windows.
//!
//! # Edge Bands
//!
//! ```text
//!        outer (rect grown by tolerance)
//!   ┌──────────────────────────────┐
//!   │  ┌────────────────────────┐  │
//!   │  │ window rect            │  │
//!   │  │  ┌──────────────────┐  │  │
//!   │  │  │ inner (shrunk by │  │  │
//!   │  │  │ tolerance)       │  │  │
//!   │  │  └──────────────────┘  │  │
//!   │  └────────────────────────┘  │
//!   └──────────────────────────────┘
//! ```
//!
//! A point is on an edge only if it lies inside the outer rectangle and not
//! strictly inside the inner one. Points deep inside a window never snap to
//! its border.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::WindowSource;
use crate::geometry::{Point, Rect};

/// Identifier of an on-screen window, as reported by the window server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// A visible window as reported by the windowing environment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Window identifier
    pub id: WindowId,
    /// Frame in screen coordinates
    pub rect: Rect,
    /// Stacking layer (negative layers belong to the desktop)
    pub layer: i32,
    /// Whether the window is currently on screen
    pub on_screen: bool,
    /// Desktop furniture (dock, menu bar, the companion's own window)
    pub system: bool,
}

impl WindowInfo {
    /// A normal application window on layer 0
    #[must_use]
    pub fn new(id: u64, rect: Rect) -> Self {
        Self {
            id: WindowId(id),
            rect,
            layer: 0,
            on_screen: true,
            system: false,
        }
    }

    /// Whether the character may walk along this window
    #[must_use]
    pub fn is_walkable(&self) -> bool {
        self.on_screen && !self.system && self.layer >= 0
    }
}

/// Which side of a window an edge belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    /// Top border (walk on it)
    Top,
    /// Bottom border (hang from it)
    Bottom,
    /// Left border (climb it)
    Left,
    /// Right border (climb it)
    Right,
}

impl EdgeType {
    /// Scan order, also the tie-break order inside one window
    pub const ALL: [EdgeType; 4] = [Self::Top, Self::Bottom, Self::Left, Self::Right];

    /// Whether movement along this edge is horizontal
    #[must_use]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

/// Association between the character and the window edge it walks along
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeBinding {
    /// Window the edge belongs to
    pub window_id: WindowId,
    /// Window frame at the time of the scan
    pub rect: Rect,
    /// Which edge
    pub edge: EdgeType,
}

impl EdgeBinding {
    /// Coordinate of the edge line (y for horizontal edges, x for vertical)
    #[must_use]
    pub fn line(&self) -> f64 {
        match self.edge {
            EdgeType::Top => self.rect.top(),
            EdgeType::Bottom => self.rect.bottom(),
            EdgeType::Left => self.rect.left(),
            EdgeType::Right => self.rect.right(),
        }
    }

    /// Snap a point onto the edge line
    #[must_use]
    pub fn snap(&self, p: Point) -> Point {
        if self.edge.is_horizontal() {
            Point::new(p.x, self.line())
        } else {
            Point::new(self.line(), p.y)
        }
    }
}

/// Result of an edge query
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeHit {
    /// Window the edge belongs to
    pub window_id: WindowId,
    /// Window frame
    pub rect: Rect,
    /// Which edge
    pub edge: EdgeType,
    /// Absolute distance from the point to the edge line
    pub distance: f64,
}

impl EdgeHit {
    /// Turn the hit into a binding the state machine can hold
    #[must_use]
    pub fn binding(&self) -> EdgeBinding {
        EdgeBinding {
            window_id: self.window_id,
            rect: self.rect,
            edge: self.edge,
        }
    }
}

/// Distance from `p` to one edge of `rect`, if `p` lies in that edge's band
fn band_distance(rect: &Rect, edge: EdgeType, p: Point, tolerance: f64) -> Option<f64> {
    let (distance, along, start, end) = match edge {
        EdgeType::Top => ((p.y - rect.top()).abs(), p.x, rect.left(), rect.right()),
        EdgeType::Bottom => ((p.y - rect.bottom()).abs(), p.x, rect.left(), rect.right()),
        EdgeType::Left => ((p.x - rect.left()).abs(), p.y, rect.top(), rect.bottom()),
        EdgeType::Right => ((p.x - rect.right()).abs(), p.y, rect.top(), rect.bottom()),
    };

    let within_span = along >= start - tolerance && along <= end + tolerance;
    (within_span && distance <= tolerance).then_some(distance)
}

/// Find the nearest window edge to `point` within `tolerance`
///
/// Windows are scanned in the given order. The smallest distance wins; on a
/// tie the first window encountered is kept, and inside one window the order
/// is top, bottom, left, right.
#[must_use]
pub fn nearest_edge(windows: &[WindowInfo], point: Point, tolerance: f64) -> Option<EdgeHit> {
    let tolerance = tolerance.max(0.0);
    let mut best: Option<EdgeHit> = None;

    for window in windows.iter().filter(|w| w.is_walkable()) {
        let outer = window.rect.inset(-tolerance);
        if !outer.contains(point) {
            continue;
        }
        let inner = window.rect.inset(tolerance);
        if inner.contains_strict(point) {
            continue;
        }

        for edge in EdgeType::ALL {
            let Some(distance) = band_distance(&window.rect, edge, point, tolerance) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| distance < b.distance) {
                best = Some(EdgeHit {
                    window_id: window.id,
                    rect: window.rect,
                    edge,
                    distance,
                });
            }
        }
    }

    best
}

/// Edge queries against the live windowing environment
#[derive(Clone)]
pub struct EdgeScanner {
    source: Arc<dyn WindowSource>,
}

impl EdgeScanner {
    /// Create a scanner over a window source
    pub fn new(source: Arc<dyn WindowSource>) -> Self {
        Self { source }
    }

    /// Current screen bounds
    #[must_use]
    pub fn screen_bounds(&self) -> Rect {
        self.source.screen_bounds()
    }

    /// Nearest edge of any visible window within `tolerance` of `point`
    #[must_use]
    pub fn find_nearest_edge(&self, point: Point, tolerance: f64) -> Option<EdgeHit> {
        let windows = self.source.visible_windows();
        nearest_edge(&windows, point, tolerance)
    }

    /// Re-validate a binding against the current window list
    ///
    /// Returns the refreshed binding (the window may have moved) when `point`
    /// still lies on the same edge of the same window.
    #[must_use]
    pub fn revalidate(&self, binding: &EdgeBinding, point: Point, tolerance: f64) -> Option<EdgeBinding> {
        let window = self
            .source
            .visible_windows()
            .into_iter()
            .find(|w| w.id == binding.window_id && w.is_walkable())?;

        band_distance(&window.rect, binding.edge, point, tolerance.max(0.0)).map(|_| EdgeBinding {
            window_id: window.id,
            rect: window.rect,
            edge: binding.edge,
        })
    }
}

impl std::fmt::Debug for EdgeScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeScanner").finish_non_exhaustive()
    }
}
