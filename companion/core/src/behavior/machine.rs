//! Behavior State Machine
//!
//! Owns the character: locomotion state, facing, position, the animation
//! tracks currently running and the tokens of the active speech and media
//! sessions. Every mutation goes through here and leaves a trail of
//! [`RenderCommand`]s in the outbox, which the coordinator drains after each
//! event.
//!
//! Entering a state always runs the exit routine of the previous one first:
//! all of its tracks are stopped (body and sub-node tracks) before the new
//! state's tracks start.

use serde::Serialize;
use tokio::time::Instant;

use super::{
    AnimationTrack, BehaviorTuning, Direction, Expression, Facing, LocomotionState, StateError,
};
use crate::edge::{EdgeBinding, EdgeScanner};
use crate::geometry::{Point, Rect, Size};
use crate::media::MediaToken;
use crate::messages::RenderCommand;
use crate::speech::SpeechToken;

/// Point of the bounding box that touches an edge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Anchor {
    BottomCenter,
    TopCenter,
    LeftMiddle,
    RightMiddle,
}

impl Anchor {
    /// Leading point when moving in `dir`
    fn leading(dir: Direction) -> Self {
        match dir {
            Direction::Up => Self::TopCenter,
            Direction::Down => Self::BottomCenter,
            Direction::Left => Self::LeftMiddle,
            Direction::Right => Self::RightMiddle,
        }
    }

    /// Side of `bbox` closest to the edge line of `binding`
    fn facing_edge(binding: &EdgeBinding, bbox: &Rect) -> Self {
        let line = binding.line();
        if binding.edge.is_horizontal() {
            if (bbox.bottom() - line).abs() <= (bbox.top() - line).abs() {
                Self::BottomCenter
            } else {
                Self::TopCenter
            }
        } else if (bbox.right() - line).abs() <= (bbox.left() - line).abs() {
            Self::RightMiddle
        } else {
            Self::LeftMiddle
        }
    }

    fn point(self, bbox: &Rect) -> Point {
        let cx = bbox.x + bbox.width / 2.0;
        let cy = bbox.y + bbox.height / 2.0;
        match self {
            Self::BottomCenter => Point::new(cx, bbox.bottom()),
            Self::TopCenter => Point::new(cx, bbox.top()),
            Self::LeftMiddle => Point::new(bbox.left(), cy),
            Self::RightMiddle => Point::new(bbox.right(), cy),
        }
    }

    /// Origin that places this anchor at `p`
    fn origin_for(self, p: Point, size: Size) -> Point {
        match self {
            Self::BottomCenter => Point::new(p.x - size.width / 2.0, p.y - size.height),
            Self::TopCenter => Point::new(p.x - size.width / 2.0, p.y),
            Self::LeftMiddle => Point::new(p.x, p.y - size.height / 2.0),
            Self::RightMiddle => Point::new(p.x - size.width, p.y - size.height / 2.0),
        }
    }
}

/// Read-only view of the character
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CharacterSnapshot {
    /// Locomotion state
    pub state: LocomotionState,
    /// Facing
    pub facing: Facing,
    /// Top-left corner of the bounding box
    pub position: Point,
    /// Bounding box size
    pub size: Size,
    /// Current face
    pub expression: Expression,
    /// Active speech session
    pub speaking: Option<SpeechToken>,
    /// Active media session
    pub media: Option<MediaToken>,
    /// Tracks the renderer should be playing
    pub active_tracks: Vec<AnimationTrack>,
}

/// The central behavior controller
pub struct BehaviorStateMachine {
    state: LocomotionState,
    state_entered: Instant,
    facing: Facing,
    position: Point,
    size: Size,
    tuning: BehaviorTuning,
    scanner: EdgeScanner,
    /// Held direction keys, most recent last
    held: Vec<Direction>,
    last_tick: Option<Instant>,
    /// Body and sub-node tracks of the current state
    active_tracks: Vec<AnimationTrack>,
    expression: Expression,
    speaking: Option<SpeechToken>,
    media: Option<MediaToken>,
    /// End of a timed state
    state_deadline: Option<Instant>,
    /// When an undisturbed Idle dozes off
    doze_at: Option<Instant>,
    anchor: Anchor,
    outbox: Vec<RenderCommand>,
}

impl BehaviorStateMachine {
    /// Create the character, standing idle at the bottom center of the screen
    #[must_use]
    pub fn new(scanner: EdgeScanner, tuning: BehaviorTuning, now: Instant) -> Self {
        let size = Size::new(tuning.character_width, tuning.character_height);
        let position = home_position(&scanner.screen_bounds(), size);

        let mut machine = Self {
            state: LocomotionState::Idle,
            state_entered: now,
            facing: Facing::default(),
            position,
            size,
            tuning,
            scanner,
            held: Vec::new(),
            last_tick: None,
            active_tracks: Vec::new(),
            expression: Expression::default(),
            speaking: None,
            media: None,
            state_deadline: None,
            doze_at: None,
            anchor: Anchor::BottomCenter,
            outbox: Vec::new(),
        };
        machine.emit(RenderCommand::MoveTo { position });
        machine.emit(RenderCommand::SetFacing {
            facing: machine.facing,
        });
        machine.enter(now);
        machine
    }

    // ============================================
    // Accessors
    // ============================================

    /// Current locomotion state
    #[must_use]
    pub fn state(&self) -> &LocomotionState {
        &self.state
    }

    /// Current facing
    #[must_use]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Top-left corner of the bounding box
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Bounding box
    #[must_use]
    pub fn bbox(&self) -> Rect {
        Rect::from_origin(self.position, self.size)
    }

    /// Current face
    #[must_use]
    pub fn expression(&self) -> Expression {
        self.expression
    }

    /// Whether the speaking overlay is on
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.speaking.is_some()
    }

    /// Whether music is playing
    #[must_use]
    pub fn is_media_active(&self) -> bool {
        self.media.is_some()
    }

    /// Whether any direction key is held
    #[must_use]
    pub fn has_held_keys(&self) -> bool {
        !self.held.is_empty()
    }

    /// Tuning in use
    #[must_use]
    pub fn tuning(&self) -> &BehaviorTuning {
        &self.tuning
    }

    /// Snapshot of the character
    #[must_use]
    pub fn snapshot(&self) -> CharacterSnapshot {
        let mut active_tracks = self.active_tracks.clone();
        if self.speaking.is_some() {
            active_tracks.push(AnimationTrack::MouthTalk);
        }
        CharacterSnapshot {
            state: self.state.clone(),
            facing: self.facing,
            position: self.position,
            size: self.size,
            expression: self.expression,
            speaking: self.speaking,
            media: self.media,
            active_tracks,
        }
    }

    /// Take the render commands produced so far
    pub fn drain_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.outbox)
    }

    // ============================================
    // Transitions
    // ============================================

    /// Request a locomotion state
    ///
    /// `Falling` and `EdgeWalking` cannot be requested; they are entered by
    /// leaving or finding an edge. While falling, only `Idle` is accepted.
    ///
    /// From `EdgeWalking` the edge is left first. Above the floor that starts
    /// a fall and the request is refused with [`StateError::FallInProgress`].
    ///
    /// # Panics
    ///
    /// Requesting `Falling` or `EdgeWalking` is a programmer error and panics
    /// in debug builds. Release builds log it and fall back to `Idle`.
    pub fn request_state(&mut self, new: LocomotionState, now: Instant) -> Result<(), StateError> {
        if matches!(
            new,
            LocomotionState::Falling | LocomotionState::EdgeWalking(_)
        ) {
            return Err(self.invalid_transition(&new, now));
        }
        if matches!(self.state, LocomotionState::Falling) && new != LocomotionState::Idle {
            tracing::debug!(requested = %new, "Request refused while falling");
            return Err(StateError::FallInProgress);
        }
        if matches!(self.state, LocomotionState::EdgeWalking(_)) {
            self.report_edge_leave(now);
            if matches!(self.state, LocomotionState::Falling) {
                tracing::debug!(requested = %new, "Request refused; left edge in mid-air");
                return Err(StateError::FallInProgress);
            }
        }
        if self.state != new {
            self.transition(new, now);
        }
        Ok(())
    }

    /// The character found a window edge while walking
    ///
    /// # Panics
    ///
    /// Outside `Walking`/`EdgeWalking` this is a programmer error; see
    /// [`request_state`](Self::request_state).
    pub fn report_edge_enter(&mut self, binding: EdgeBinding, now: Instant) -> Result<(), StateError> {
        if !matches!(
            self.state,
            LocomotionState::Walking(_) | LocomotionState::EdgeWalking(_)
        ) {
            return Err(self.invalid_transition(&LocomotionState::EdgeWalking(binding), now));
        }

        let anchor = Anchor::facing_edge(&binding, &self.bbox());
        let snapped = anchor.origin_for(binding.snap(anchor.point(&self.bbox())), self.size);
        let target = self.scanner.screen_bounds().clamp_origin(snapped, self.size);

        tracing::info!(window = %binding.window_id, edge = ?binding.edge, "Edge entered");
        self.anchor = anchor;
        self.transition(LocomotionState::EdgeWalking(binding), now);
        self.move_to(target);
        Ok(())
    }

    /// The character left its edge
    ///
    /// Above the floor this starts a fall; at the floor the character keeps
    /// walking (or stands still when no key is held).
    pub fn report_edge_leave(&mut self, now: Instant) {
        if !matches!(self.state, LocomotionState::EdgeWalking(_)) {
            tracing::debug!(state = %self.state, "Edge leave ignored");
            return;
        }

        let floor = self.scanner.screen_bounds().bottom();
        let above_floor = self.bbox().bottom() < floor - self.tuning.floor_threshold;
        tracing::info!(above_floor, "Edge left");

        let next = if above_floor {
            LocomotionState::Falling
        } else {
            self.held
                .last()
                .map_or_else(|| self.resting_state(), |d| LocomotionState::Walking(*d))
        };
        self.transition(next, now);
    }

    /// Speech overlay on
    ///
    /// Wakes a sleeping character. A second start replaces the first token.
    pub fn report_speech_start(&mut self, token: SpeechToken, now: Instant) {
        if matches!(self.state, LocomotionState::Sleeping) {
            let next = self.resting_state();
            self.transition(next, now);
        }
        if self.speaking.replace(token).is_some() {
            self.emit(RenderCommand::StopTrack {
                track: AnimationTrack::MouthTalk,
            });
        }
        self.emit(RenderCommand::StartTrack {
            track: AnimationTrack::MouthTalk,
        });
        self.set_expression(Expression::Talking);
        self.doze_at = None;
    }

    /// Speech overlay off; restores the face of the current state
    pub fn report_speech_end(&mut self, token: SpeechToken, now: Instant) {
        if self.speaking != Some(token) {
            tracing::debug!(token = %token, "Stale speech end ignored");
            return;
        }
        self.speaking = None;
        self.emit(RenderCommand::StopTrack {
            track: AnimationTrack::MouthTalk,
        });
        self.set_expression(self.state.resting_expression());
        if matches!(self.state, LocomotionState::Idle) {
            self.doze_at = Some(now + self.tuning.sleep_after);
        }
    }

    /// Music started
    pub fn report_media_start(&mut self, token: MediaToken, now: Instant) {
        self.media = Some(token);
        if matches!(self.state, LocomotionState::Idle | LocomotionState::Sleeping) {
            self.transition(LocomotionState::ListeningToMusic, now);
        }
    }

    /// Music ended
    pub fn report_media_end(&mut self, token: MediaToken, now: Instant) {
        if self.media != Some(token) {
            tracing::debug!(token = %token, "Stale media end ignored");
            return;
        }
        self.media = None;
        if matches!(self.state, LocomotionState::ListeningToMusic) {
            self.transition(LocomotionState::Idle, now);
        }
    }

    /// Brief excitement (after a joke, for example)
    ///
    /// Only a resting character gets excited; returns whether it did.
    pub fn celebrate(&mut self, now: Instant) -> bool {
        if matches!(
            self.state,
            LocomotionState::Idle | LocomotionState::Sleeping | LocomotionState::ListeningToMusic
        ) {
            self.transition(LocomotionState::Excited, now);
            true
        } else {
            false
        }
    }

    /// Back to idle at the home position; interrupts a fall
    pub fn reset_position(&mut self, now: Instant) {
        if self.state != LocomotionState::Idle {
            self.transition(LocomotionState::Idle, now);
        }
        let home = home_position(&self.scanner.screen_bounds(), self.size);
        self.move_to(home);
    }

    /// Put the character somewhere else (dragging, tests)
    pub fn place_at(&mut self, origin: Point) {
        let target = self.scanner.screen_bounds().clamp_origin(origin, self.size);
        self.move_to(target);
    }

    // ============================================
    // Input
    // ============================================

    /// A direction key went down; returns whether it was newly pressed
    pub fn press_key(&mut self, dir: Direction) -> bool {
        if self.held.contains(&dir) {
            return false;
        }
        self.held.push(dir);
        true
    }

    /// A direction key went up
    pub fn release_key(&mut self, dir: Direction, now: Instant) {
        self.held.retain(|d| *d != dir);

        if let LocomotionState::Walking(current) = self.state {
            match self.held.last().copied() {
                Some(next) if next != current => {
                    self.transition(LocomotionState::Walking(next), now);
                }
                Some(_) => {}
                None => {
                    let next = self.resting_state();
                    self.transition(next, now);
                }
            }
        }
    }

    /// Move one step in the most recently held direction
    ///
    /// Ticks closer together than the minimum spacing are dropped. Returns
    /// whether the character moved.
    pub fn tick_movement(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_tick {
            if now.saturating_duration_since(last) < self.tuning.min_tick_spacing {
                tracing::trace!("Movement tick dropped");
                return false;
            }
        }
        let Some(dir) = self.held.last().copied() else {
            return false;
        };
        self.last_tick = Some(now);

        if matches!(self.state, LocomotionState::Falling) {
            return false;
        }

        self.face(dir);

        if let LocomotionState::EdgeWalking(binding) = &self.state {
            let binding = binding.clone();
            return self.edge_step(&binding, dir, now);
        }

        if self.state != LocomotionState::Walking(dir) {
            self.transition(LocomotionState::Walking(dir), now);
        }
        self.free_step(dir, now)
    }

    /// The window list changed; re-check the current edge
    pub fn windows_changed(&mut self, now: Instant) {
        let LocomotionState::EdgeWalking(binding) = &self.state else {
            return;
        };
        let anchor_point = self.anchor.point(&self.bbox());
        match self
            .scanner
            .revalidate(binding, anchor_point, self.tuning.edge_tolerance)
        {
            Some(fresh) => {
                let snapped = self.anchor.origin_for(fresh.snap(anchor_point), self.size);
                let target = self.scanner.screen_bounds().clamp_origin(snapped, self.size);
                self.state = LocomotionState::EdgeWalking(fresh);
                self.move_to(target);
            }
            None => self.report_edge_leave(now),
        }
    }

    // ============================================
    // Time
    // ============================================

    /// Next moment `advance` has work to do
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.state_deadline, self.doze_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run expired timed states and the doze timer
    pub fn advance(&mut self, now: Instant) {
        if self.state_deadline.is_some_and(|d| now >= d) {
            self.state_deadline = None;
            if self.state.is_timed() {
                let next = if matches!(self.state, LocomotionState::Falling) {
                    LocomotionState::Idle
                } else {
                    self.resting_state()
                };
                self.transition(next, now);
            }
        }

        if self.doze_at.is_some_and(|d| now >= d) {
            self.doze_at = None;
            if matches!(self.state, LocomotionState::Idle) && self.speaking.is_none() {
                let next = if self.media.is_some() {
                    LocomotionState::ListeningToMusic
                } else {
                    LocomotionState::Sleeping
                };
                self.transition(next, now);
            }
        }
    }

    // ============================================
    // Internals
    // ============================================

    fn emit(&mut self, command: RenderCommand) {
        self.outbox.push(command);
    }

    fn resting_state(&self) -> LocomotionState {
        if self.media.is_some() {
            LocomotionState::ListeningToMusic
        } else {
            LocomotionState::Idle
        }
    }

    fn invalid_transition(&mut self, to: &LocomotionState, now: Instant) -> StateError {
        let err = StateError::InvalidTransition {
            from: self.state.name(),
            to: to.name(),
        };
        tracing::error!(from = %self.state, to = %to, "Invalid state transition");
        if cfg!(debug_assertions) {
            panic!("{err}");
        }
        self.transition(LocomotionState::Idle, now);
        err
    }

    fn transition(&mut self, new: LocomotionState, now: Instant) {
        let dwell_ms = duration_ms(now.saturating_duration_since(self.state_entered));
        tracing::info!(from = %self.state, to = %new, dwell_ms, "State transition");
        self.exit();
        self.state = new;
        self.state_entered = now;
        self.enter(now);
    }

    fn exit(&mut self) {
        for track in std::mem::take(&mut self.active_tracks) {
            self.emit(RenderCommand::StopTrack { track });
        }
        self.state_deadline = None;
        self.doze_at = None;
    }

    fn enter(&mut self, now: Instant) {
        self.emit(RenderCommand::EnterState {
            state: self.state.clone(),
        });

        let body = self.state.body_track();
        let subs = self.state.sub_tracks();
        for track in std::iter::once(body).chain(subs.iter().copied()) {
            self.active_tracks.push(track);
            self.emit(RenderCommand::StartTrack { track });
        }

        if self.speaking.is_none() {
            self.set_expression(self.state.resting_expression());
        }

        match self.state {
            LocomotionState::Idle => {
                if self.speaking.is_none() {
                    self.doze_at = Some(now + self.tuning.sleep_after);
                }
            }
            LocomotionState::Falling => {
                let screen = self.scanner.screen_bounds();
                let target = screen.clamp_origin(
                    Point::new(self.position.x, screen.bottom() - self.size.height),
                    self.size,
                );
                self.state_deadline = Some(now + self.tuning.fall_duration);
                self.emit(RenderCommand::FallTo {
                    target,
                    duration_ms: duration_ms(self.tuning.fall_duration),
                });
                self.position = target;
            }
            LocomotionState::Excited => {
                self.state_deadline = Some(now + self.tuning.excited_duration);
            }
            LocomotionState::Dancing => {
                self.state_deadline = Some(now + self.tuning.dance_duration);
            }
            _ => {}
        }
    }

    fn set_expression(&mut self, expression: Expression) {
        if self.expression != expression {
            self.expression = expression;
            self.emit(RenderCommand::SetExpression { expression });
        }
    }

    fn face(&mut self, dir: Direction) {
        let facing = match dir {
            Direction::Left => Facing::Left,
            Direction::Right => Facing::Right,
            Direction::Up | Direction::Down => return,
        };
        if self.facing != facing {
            self.facing = facing;
            self.emit(RenderCommand::SetFacing { facing });
        }
    }

    fn move_to(&mut self, position: Point) -> bool {
        if self.position == position {
            return false;
        }
        self.position = position;
        self.emit(RenderCommand::MoveTo { position });
        true
    }

    fn step(&self, dir: Direction) -> Point {
        let (dx, dy) = dir.unit();
        self.position
            .offset(dx * self.tuning.step_px, dy * self.tuning.step_px)
    }

    /// Free movement; clamps at the screen unless a window edge takes over
    fn free_step(&mut self, dir: Direction, now: Instant) -> bool {
        let screen = self.scanner.screen_bounds();
        let proposed = self.step(dir);

        if !screen.contains_rect(&Rect::from_origin(proposed, self.size)) {
            let probe = Anchor::leading(dir).point(&self.bbox());
            if let Some(hit) = self
                .scanner
                .find_nearest_edge(probe, self.tuning.edge_tolerance)
            {
                tracing::debug!(window = %hit.window_id, distance = hit.distance, "Edge found at screen bound");
                return self.report_edge_enter(hit.binding(), now).is_ok();
            }
        }

        self.move_to(screen.clamp_origin(proposed, self.size))
    }

    /// Movement along the bound edge; perpendicular input is ignored
    fn edge_step(&mut self, binding: &EdgeBinding, dir: Direction, now: Instant) -> bool {
        if dir.is_horizontal() != binding.edge.is_horizontal() {
            return false;
        }

        let screen = self.scanner.screen_bounds();
        let proposed = screen.clamp_origin(self.step(dir), self.size);
        let anchor_point = self.anchor.point(&Rect::from_origin(proposed, self.size));

        match self
            .scanner
            .revalidate(binding, anchor_point, self.tuning.edge_tolerance)
        {
            Some(fresh) => {
                let snapped = self.anchor.origin_for(fresh.snap(anchor_point), self.size);
                self.state = LocomotionState::EdgeWalking(fresh);
                self.move_to(screen.clamp_origin(snapped, self.size))
            }
            None => {
                let moved = self.move_to(proposed);
                self.report_edge_leave(now);
                moved
            }
        }
    }
}

impl std::fmt::Debug for BehaviorStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorStateMachine")
            .field("state", &self.state)
            .field("facing", &self.facing)
            .field("position", &self.position)
            .field("speaking", &self.speaking)
            .field("media", &self.media)
            .finish_non_exhaustive()
    }
}

/// Bottom center of the screen
fn home_position(screen: &Rect, size: Size) -> Point {
    screen.clamp_origin(
        Point::new(
            screen.x + (screen.width - size.width) / 2.0,
            screen.bottom() - size.height,
        ),
        size,
    )
}

fn duration_ms(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backend::SharedWindows;
    use crate::edge::{EdgeType, WindowInfo};

    const TICK: Duration = Duration::from_millis(50);

    fn machine_with(windows: Vec<WindowInfo>) -> (BehaviorStateMachine, Arc<SharedWindows>, Instant) {
        let source = Arc::new(SharedWindows::new(Rect::new(0.0, 0.0, 800.0, 600.0)));
        source.set_windows(windows);
        let now = Instant::now();
        let machine = BehaviorStateMachine::new(
            EdgeScanner::new(source.clone()),
            BehaviorTuning::default(),
            now,
        );
        (machine, source, now)
    }

    /// Replays commands the way a renderer would and checks the track invariant
    fn replay_body_tracks(commands: &[RenderCommand]) -> HashSet<AnimationTrack> {
        let mut active = HashSet::new();
        for cmd in commands {
            match cmd {
                RenderCommand::StartTrack { track } if track.is_locomotion() => {
                    active.insert(*track);
                }
                RenderCommand::StopTrack { track } => {
                    active.remove(track);
                }
                _ => {}
            }
            assert!(active.len() <= 1, "two body tracks at once: {active:?}");
        }
        active
    }

    #[test]
    fn test_starts_idle_at_home() {
        let (mut m, _, _) = machine_with(Vec::new());
        assert_eq!(m.state(), &LocomotionState::Idle);
        assert_eq!(m.position(), Point::new(376.0, 552.0));

        let commands = m.drain_commands();
        assert!(commands.contains(&RenderCommand::EnterState {
            state: LocomotionState::Idle
        }));
        assert!(commands.contains(&RenderCommand::StartTrack {
            track: AnimationTrack::Breathe
        }));
    }

    #[test]
    fn test_walk_steps_five_pixels_and_drops_burst_ticks() {
        let (mut m, _, t0) = machine_with(Vec::new());
        m.press_key(Direction::Left);

        assert!(m.tick_movement(t0));
        assert_eq!(m.state(), &LocomotionState::Walking(Direction::Left));
        assert_eq!(m.position().x, 371.0);
        assert_eq!(m.facing(), Facing::Left);

        assert!(!m.tick_movement(t0 + Duration::from_millis(5)));
        assert_eq!(m.position().x, 371.0);

        assert!(m.tick_movement(t0 + Duration::from_millis(10)));
        assert_eq!(m.position().x, 366.0);
    }

    #[test]
    fn test_release_returns_to_idle() {
        let (mut m, _, t0) = machine_with(Vec::new());
        m.press_key(Direction::Up);
        m.tick_movement(t0);
        m.release_key(Direction::Up, t0 + TICK);
        assert_eq!(m.state(), &LocomotionState::Idle);
    }

    #[test]
    fn test_clamped_at_screen_without_window() {
        let (mut m, _, t0) = machine_with(Vec::new());
        m.place_at(Point::new(750.0, 300.0));
        m.press_key(Direction::Right);

        m.tick_movement(t0);
        m.tick_movement(t0 + TICK);
        assert_eq!(m.state(), &LocomotionState::Walking(Direction::Right));
        assert_eq!(m.position().x, 752.0);
        assert!(m.bbox().right() <= 800.0);
    }

    #[test]
    fn test_screen_bound_with_window_edge_starts_edge_walking() {
        // Right edge of this window sits on the right screen bound
        let (mut m, _, t0) = machine_with(vec![WindowInfo::new(
            1,
            Rect::new(400.0, 150.0, 400.0, 100.0),
        )]);
        m.place_at(Point::new(752.0, 160.0));
        m.press_key(Direction::Right);
        m.tick_movement(t0);

        match m.state() {
            LocomotionState::EdgeWalking(b) => assert_eq!(b.edge, EdgeType::Right),
            other => panic!("expected edge walking, got {other}"),
        }
        assert_eq!(m.bbox().right(), 800.0);
    }

    #[test]
    fn test_leaving_edge_above_floor_falls_then_idles() {
        let (mut m, _, t0) = machine_with(vec![WindowInfo::new(
            1,
            Rect::new(400.0, 150.0, 400.0, 100.0),
        )]);
        m.place_at(Point::new(752.0, 160.0));
        m.press_key(Direction::Right);
        m.tick_movement(t0);
        m.release_key(Direction::Right, t0);
        m.press_key(Direction::Up);

        let mut now = t0;
        for _ in 0..20 {
            now += TICK;
            m.tick_movement(now);
            if m.state() == &LocomotionState::Falling {
                break;
            }
        }
        assert_eq!(m.state(), &LocomotionState::Falling);
        assert_eq!(m.bbox().bottom(), 600.0);

        // Input during the fall changes nothing
        m.press_key(Direction::Left);
        assert!(!m.tick_movement(now + TICK));
        assert_eq!(
            m.request_state(LocomotionState::Dancing, now + TICK),
            Err(StateError::FallInProgress)
        );

        m.advance(now + Duration::from_millis(999));
        assert_eq!(m.state(), &LocomotionState::Falling);
        m.advance(now + Duration::from_millis(1000));
        assert_eq!(m.state(), &LocomotionState::Idle);

        replay_body_tracks(&m.drain_commands());
    }

    #[test]
    fn test_idle_reset_interrupts_fall() {
        let (mut m, _, t0) = machine_with(vec![WindowInfo::new(
            1,
            Rect::new(400.0, 150.0, 400.0, 100.0),
        )]);
        m.place_at(Point::new(752.0, 160.0));
        m.press_key(Direction::Right);
        m.tick_movement(t0);
        m.report_edge_leave(t0 + TICK);
        assert_eq!(m.state(), &LocomotionState::Falling);

        m.reset_position(t0 + TICK * 2);
        assert_eq!(m.state(), &LocomotionState::Idle);
        assert_eq!(m.next_deadline(), Some(t0 + TICK * 2 + Duration::from_secs(90)));
    }

    #[test]
    fn test_requested_state_on_high_edge_falls_instead() {
        let (mut m, _, t0) = machine_with(vec![WindowInfo::new(
            1,
            Rect::new(400.0, 150.0, 400.0, 100.0),
        )]);
        m.place_at(Point::new(752.0, 160.0));
        m.press_key(Direction::Right);
        m.tick_movement(t0);
        m.release_key(Direction::Right, t0);
        assert!(matches!(m.state(), LocomotionState::EdgeWalking(_)));

        assert_eq!(
            m.request_state(LocomotionState::Dancing, t0 + TICK),
            Err(StateError::FallInProgress)
        );
        assert_eq!(m.state(), &LocomotionState::Falling);
        assert_eq!(m.bbox().bottom(), 600.0);

        m.advance(t0 + TICK + Duration::from_secs(1));
        assert_eq!(m.state(), &LocomotionState::Idle);
        replay_body_tracks(&m.drain_commands());
    }

    #[test]
    fn test_requested_state_on_floor_edge_is_granted() {
        let (mut m, _, t0) = machine_with(vec![WindowInfo::new(
            1,
            Rect::new(100.0, 300.0, 200.0, 300.0),
        )]);
        m.place_at(Point::new(150.0, 552.0));
        m.press_key(Direction::Down);
        m.tick_movement(t0);
        m.release_key(Direction::Down, t0);
        assert!(matches!(m.state(), LocomotionState::EdgeWalking(_)));

        m.request_state(LocomotionState::Sleeping, t0 + TICK).unwrap();
        assert_eq!(m.state(), &LocomotionState::Sleeping);
        assert_eq!(m.bbox().bottom(), 600.0);
    }

    #[test]
    fn test_leaving_edge_at_floor_keeps_walking() {
        // Bottom edge of the window lies on the floor
        let (mut m, _, t0) = machine_with(vec![WindowInfo::new(
            1,
            Rect::new(100.0, 300.0, 200.0, 300.0),
        )]);
        m.place_at(Point::new(150.0, 552.0));
        m.press_key(Direction::Down);
        m.tick_movement(t0);
        assert!(matches!(m.state(), LocomotionState::EdgeWalking(_)));

        m.release_key(Direction::Down, t0);
        m.press_key(Direction::Right);
        let mut now = t0;
        for _ in 0..40 {
            now += TICK;
            m.tick_movement(now);
            if !matches!(m.state(), LocomotionState::EdgeWalking(_)) {
                break;
            }
        }
        assert_eq!(m.state(), &LocomotionState::Walking(Direction::Right));
    }

    #[test]
    fn test_each_transition_stops_previous_tracks() {
        let (mut m, _, t0) = machine_with(Vec::new());
        m.press_key(Direction::Left);
        m.tick_movement(t0);
        m.release_key(Direction::Left, t0 + TICK);
        m.request_state(LocomotionState::Dancing, t0 + TICK).unwrap();
        m.celebrate(t0 + TICK);
        m.request_state(LocomotionState::Sleeping, t0 + TICK).unwrap();

        let active = replay_body_tracks(&m.drain_commands());
        assert_eq!(active, HashSet::from([AnimationTrack::Snooze]));
        assert_eq!(m.snapshot().active_tracks, vec![AnimationTrack::Snooze]);
    }

    #[test]
    fn test_speech_end_restores_current_state_expression() {
        let (mut m, _, t0) = machine_with(Vec::new());
        m.report_speech_start(SpeechToken(1), t0);
        assert_eq!(m.expression(), Expression::Talking);

        m.press_key(Direction::Right);
        m.tick_movement(t0);
        assert_eq!(m.expression(), Expression::Talking);

        m.report_speech_end(SpeechToken(1), t0 + TICK);
        assert_eq!(m.expression(), Expression::Focused);
    }

    #[test]
    fn test_stale_speech_end_is_ignored() {
        let (mut m, _, t0) = machine_with(Vec::new());
        m.report_speech_start(SpeechToken(1), t0);
        m.report_speech_start(SpeechToken(2), t0);
        m.report_speech_end(SpeechToken(1), t0);
        assert!(m.is_speaking());
        assert_eq!(m.expression(), Expression::Talking);
    }

    #[test]
    fn test_media_moves_idle_to_music_and_back() {
        let (mut m, _, t0) = machine_with(Vec::new());
        m.report_media_start(MediaToken(1), t0);
        assert_eq!(m.state(), &LocomotionState::ListeningToMusic);

        m.report_media_end(MediaToken(7), t0);
        assert_eq!(m.state(), &LocomotionState::ListeningToMusic);

        m.report_media_end(MediaToken(1), t0);
        assert_eq!(m.state(), &LocomotionState::Idle);
    }

    #[test]
    fn test_doze_after_idle_stretch() {
        let (mut m, _, t0) = machine_with(Vec::new());
        assert_eq!(m.next_deadline(), Some(t0 + Duration::from_secs(90)));

        m.advance(t0 + Duration::from_secs(89));
        assert_eq!(m.state(), &LocomotionState::Idle);
        m.advance(t0 + Duration::from_secs(90));
        assert_eq!(m.state(), &LocomotionState::Sleeping);

        // Speech wakes the character
        m.report_speech_start(SpeechToken(1), t0 + Duration::from_secs(91));
        assert_eq!(m.state(), &LocomotionState::Idle);
        assert_eq!(m.next_deadline(), None);
    }

    #[test]
    fn test_timed_states_return_to_music_when_playing() {
        let (mut m, _, t0) = machine_with(Vec::new());
        m.request_state(LocomotionState::Dancing, t0).unwrap();
        m.report_media_start(MediaToken(1), t0);
        assert_eq!(m.state(), &LocomotionState::Dancing);

        m.advance(t0 + Duration::from_secs(6));
        assert_eq!(m.state(), &LocomotionState::ListeningToMusic);

        m.report_media_end(MediaToken(1), t0 + Duration::from_secs(7));
        assert!(m.celebrate(t0 + Duration::from_secs(7)));
        m.advance(t0 + Duration::from_secs(9));
        assert_eq!(m.state(), &LocomotionState::Idle);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "invalid transition")]
    fn test_requesting_falling_is_fatal_in_debug() {
        let (mut m, _, t0) = machine_with(Vec::new());
        let _ = m.request_state(LocomotionState::Falling, t0);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_requesting_falling_falls_back_to_idle_in_release() {
        let (mut m, _, t0) = machine_with(Vec::new());
        m.request_state(LocomotionState::Dancing, t0).unwrap();
        let err = m.request_state(LocomotionState::Falling, t0).unwrap_err();
        assert!(matches!(err, StateError::InvalidTransition { .. }));
        assert_eq!(m.state(), &LocomotionState::Idle);
    }
}
