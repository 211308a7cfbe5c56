//! Drawing
//!
//! The playground maps the companion's pixel coordinates onto terminal
//! cells: one cell is [`CELL_WIDTH`] by [`CELL_HEIGHT`] pixels. The bottom row
//! is the status line and is not part of the desktop.

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use companion_core::{Point, Rect as WorldRect, WindowInfo};

use crate::scene::Scene;
use crate::sprite::{self, Pose};
use crate::theme;

/// Pixels per cell, horizontally
pub const CELL_WIDTH: f64 = 8.0;

/// Pixels per cell, vertically
pub const CELL_HEIGHT: f64 = 16.0;

/// Rows reserved below the desktop
const STATUS_ROWS: u16 = 1;

/// Widest speech bubble, in cells
const BUBBLE_MAX_WIDTH: u16 = 32;

/// Terminal geometry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    /// Terminal columns
    pub cols: u16,
    /// Terminal rows
    pub rows: u16,
}

impl Viewport {
    /// Viewport for a terminal of `cols` by `rows`
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Rows showing the desktop
    #[must_use]
    pub fn stage_rows(&self) -> u16 {
        self.rows.saturating_sub(STATUS_ROWS)
    }

    /// Desktop bounds in pixels
    #[must_use]
    pub fn screen(&self) -> WorldRect {
        WorldRect::new(
            0.0,
            0.0,
            f64::from(self.cols) * CELL_WIDTH,
            f64::from(self.stage_rows()) * CELL_HEIGHT,
        )
    }

    /// Pixel position of the top-left corner of a cell
    #[must_use]
    pub fn to_world(&self, col: u16, row: u16) -> Point {
        Point::new(f64::from(col) * CELL_WIDTH, f64::from(row) * CELL_HEIGHT)
    }

    /// Cells covered by a pixel rectangle, clipped to the desktop
    #[must_use]
    pub fn cells(&self, rect: &WorldRect) -> Option<Rect> {
        let clamp_x = |v: f64| v.clamp(0.0, f64::from(self.cols)) as u16;
        let clamp_y = |v: f64| v.clamp(0.0, f64::from(self.stage_rows())) as u16;

        let x0 = clamp_x((rect.left() / CELL_WIDTH).floor());
        let y0 = clamp_y((rect.top() / CELL_HEIGHT).floor());
        let x1 = clamp_x((rect.right() / CELL_WIDTH).ceil());
        let y1 = clamp_y((rect.bottom() / CELL_HEIGHT).ceil());

        (x1 > x0 && y1 > y0).then(|| Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Cell holding a pixel position, clipped to the desktop
    #[must_use]
    pub fn cell_of(&self, p: Point) -> (u16, u16) {
        let col = (p.x / CELL_WIDTH).round().clamp(0.0, f64::from(self.cols.saturating_sub(1)));
        let row = (p.y / CELL_HEIGHT)
            .round()
            .clamp(0.0, f64::from(self.stage_rows().saturating_sub(1)));
        (col as u16, row as u16)
    }
}

/// Everything one frame shows
pub struct FrameView<'a> {
    /// Terminal geometry
    pub viewport: Viewport,
    /// Character state
    pub scene: &'a Scene,
    /// Where to draw the character
    pub position: Point,
    /// Windows on the desktop
    pub windows: &'a [WindowInfo],
    /// Animation frame counter
    pub frame: u64,
    /// Local status message
    pub status: Option<&'a str>,
}

/// Draw one frame
pub fn draw(f: &mut Frame, view: &FrameView<'_>) {
    let area = f.area();

    // Back to front, so the front window is drawn last.
    for window in view.windows.iter().rev().filter(|w| w.on_screen) {
        if let Some(cells) = view.viewport.cells(&window.rect) {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme::WINDOW_FRAME))
                .title(format!(" {} ", window.id));
            f.render_widget(Clear, cells);
            f.render_widget(block, cells);
        }
    }

    let (col, row) = view.viewport.cell_of(view.position);
    let sprite_area = Rect::new(col, row, sprite::WIDTH, sprite::HEIGHT).intersection(area);
    let pose = Pose::new(view.scene.expression(), view.scene.facing(), |t| {
        view.scene.is_playing(t)
    });
    let fur = Style::default().fg(theme::fur_for(view.scene.expression()));
    let rows: Vec<Line> = sprite::lines(pose, view.frame)
        .into_iter()
        .map(|row| Line::from(Span::styled(row, fur)))
        .collect();
    f.render_widget(Paragraph::new(rows), sprite_area);

    if let Some(bubble) = view.scene.bubble() {
        draw_bubble(f, view.viewport, sprite_area, &bubble.text);
    }

    draw_status(f, view);
}

fn draw_bubble(f: &mut Frame, viewport: Viewport, anchor: Rect, text: &str) {
    let inner_width = BUBBLE_MAX_WIDTH.min(viewport.cols.saturating_sub(2)).max(1);
    let wrapped = textwrap::wrap(text, usize::from(inner_width));
    let text_width = wrapped
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);
    let width = (u16::try_from(text_width).unwrap_or(inner_width) + 2).min(viewport.cols);
    let height = (u16::try_from(wrapped.len()).unwrap_or(u16::MAX))
        .saturating_add(2)
        .min(viewport.stage_rows());

    let center = anchor.x + anchor.width / 2;
    let x = center
        .saturating_sub(width / 2)
        .min(viewport.cols.saturating_sub(width));
    let y = if anchor.y >= height {
        anchor.y - height
    } else {
        (anchor.y + anchor.height).min(viewport.stage_rows().saturating_sub(height))
    };
    let area = Rect::new(x, y, width, height);

    let lines: Vec<Line> = wrapped.into_iter().map(|l| Line::from(l.into_owned())).collect();
    let bubble = Paragraph::new(lines)
        .style(Style::default().fg(theme::BUBBLE_TEXT))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme::BUBBLE_FRAME)),
        );
    f.render_widget(Clear, area);
    f.render_widget(bubble, area);
}

fn draw_status(f: &mut Frame, view: &FrameView<'_>) {
    let area = f.area();
    if area.height == 0 {
        return;
    }
    let status_area = Rect::new(0, area.height - 1, area.width, 1);

    let mut spans = vec![Span::styled(
        format!(" {} ", view.scene.state()),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(notice) = view.scene.notice() {
        spans.push(Span::styled(
            format!(" {notice} "),
            Style::default().fg(theme::NOTICE_YELLOW),
        ));
    }
    let hint = view.status.unwrap_or(
        "arrows move · g greet · j joke · f fact · c chat · p play · s stop · d dance · z sleep · 1-6 voice · n/x window · r reset · q quit",
    );
    spans.push(Span::styled(
        format!(" {hint}"),
        Style::default().fg(theme::DIM_GRAY),
    ));

    f.render_widget(Paragraph::new(Line::from(spans)), status_area);
}
