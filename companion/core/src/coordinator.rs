//! Coordinator - The Coordination Loop
//!
//! One tokio task owns the character and everything that mutates it: the
//! behavior state machine, the action gate, the speech and media session
//! managers and the timer queue. Nothing else touches them.
//!
//! ```text
//!   TUI / daemon ──CoordinatorHandle──┐
//!                                     ▼
//!   background tasks ──results──► [ event channel ] ──► Coordinator ──► RenderCommand ──► renderer
//!        ▲                                                  │
//!        └────────── spawn (TTS, track fetch, watch) ◄──────┘
//!                                                           │
//!                           sleep_until(next deadline) ◄────┘
//! ```
//!
//! Background work (speech synthesis, fetching tracks, waiting for playback to
//! end) runs on spawned tasks that post their results back as events tagged
//! with the session token that asked. Results for tokens that are no longer
//! current are dropped.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::backend::{
    AudioOutput, FetchingMediaPlayer, GoogleTtsSynthesizer, HeadlessAudio, MediaPlayer, Playback,
    SpeechSynthesizer, WindowSource,
};
use crate::behavior::{BehaviorStateMachine, CharacterSnapshot, Direction, LocomotionState};
use crate::config::CompanionConfig;
use crate::edge::EdgeScanner;
use crate::events::{CoordinatorEvent, DispatchError, KeyPhase, MenuAction};
use crate::gate::{ActionGate, Busy};
use crate::geometry::Point;
use crate::media::{
    MediaCompletion, MediaError, MediaManager, MediaSource, MediaStage, MediaStep, MediaToken,
};
use crate::messages::RenderCommand;
use crate::prefs::Preferences;
use crate::speech::{
    AudioAcceptance, Conversation, ConversationToken, DialogueBook, SpeechCompletion, SpeechEnd,
    SpeechError, SpeechManager, SpeechOrigin, SpeechRequest, SpeechSession, SpeechToken, VoiceType,
};
use crate::timers::{TimerKind, TimerQueue};

/// Shown once per run of speech network failures
const NETWORK_NOTICE: &str = "I can't reach my voice right now, so I'll just show my words.";

/// Said when no stage of a track would play
const MEDIA_APOLOGY: &str = "Sorry, I couldn't play that song.";

/// Said when there is nothing to play
const NO_TRACKS_LINE: &str = "I don't know any songs yet.";

// =============================================================================
// Services
// =============================================================================

/// Collaborators injected into the coordinator
#[derive(Clone)]
pub struct Services {
    /// Text-to-speech
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Sink for synthesized speech
    pub audio: Arc<dyn AudioOutput>,
    /// Music playback
    pub media: Arc<dyn MediaPlayer>,
    /// Window rectangles for edge detection
    pub windows: Arc<dyn WindowSource>,
    /// Persisted voice and API key
    pub preferences: Preferences,
    /// Lines to say
    pub dialogue: DialogueBook,
}

impl Services {
    /// Cloud TTS, fetched tracks and silent audio output over `windows`
    #[must_use]
    pub fn standard(
        config: &CompanionConfig,
        windows: Arc<dyn WindowSource>,
        preferences: Preferences,
    ) -> Self {
        let audio: Arc<dyn AudioOutput> = Arc::new(HeadlessAudio::new());
        Self {
            synthesizer: Arc::new(GoogleTtsSynthesizer::new(
                config.tts_endpoint.clone(),
                preferences.clone(),
            )),
            media: Arc::new(FetchingMediaPlayer::new(Arc::clone(&audio))),
            audio,
            windows,
            preferences,
            dialogue: DialogueBook::default(),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("synthesizer", &self.synthesizer.name())
            .field("preferences", &self.preferences)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable sender side of the coordination loop
///
/// Usable from any thread or task. Every method returns `false` (or `None`)
/// once the coordinator has stopped.
#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    /// Post a raw event
    pub fn send(&self, event: CoordinatorEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Key went down
    pub fn press(&self, direction: Direction) -> bool {
        self.send(CoordinatorEvent::Key {
            direction,
            phase: KeyPhase::Pressed,
        })
    }

    /// Key went up
    pub fn release(&self, direction: Direction) -> bool {
        self.send(CoordinatorEvent::Key {
            direction,
            phase: KeyPhase::Released,
        })
    }

    /// Fire-and-forget menu action
    pub fn menu(&self, action: MenuAction) -> bool {
        self.send(CoordinatorEvent::Menu {
            action,
            reply: None,
        })
    }

    /// Menu action, waiting for the gate's verdict
    ///
    /// # Errors
    ///
    /// [`DispatchError::Busy`] when the gate refused the action,
    /// [`DispatchError::Closed`] when the coordinator is gone.
    pub async fn dispatch(&self, action: MenuAction) -> Result<(), DispatchError> {
        let (reply, verdict) = oneshot::channel();
        if !self.send(CoordinatorEvent::Menu {
            action,
            reply: Some(reply),
        }) {
            return Err(DispatchError::Closed);
        }
        verdict.await.map_err(|_| DispatchError::Closed)??;
        Ok(())
    }

    /// Speak `text` for `duration`, bypassing the gate
    pub fn speak(
        &self,
        text: impl Into<String>,
        duration: Duration,
        completion: Option<SpeechCompletion>,
    ) -> bool {
        self.send(CoordinatorEvent::Speak {
            text: text.into(),
            duration,
            completion,
        })
    }

    /// Cancel the current utterance
    pub fn cancel_speech(&self) -> bool {
        self.send(CoordinatorEvent::CancelSpeech)
    }

    /// Play a track, bypassing the gate
    pub fn play(&self, uri: impl Into<String>, completion: Option<MediaCompletion>) -> bool {
        self.send(CoordinatorEvent::Play {
            uri: uri.into(),
            completion,
        })
    }

    /// Stop the current track
    pub fn stop_music(&self) -> bool {
        self.send(CoordinatorEvent::StopMusic)
    }

    /// The character was dragged to `origin`
    pub fn drag_to(&self, origin: Point) -> bool {
        self.send(CoordinatorEvent::Drag { origin })
    }

    /// The window list changed
    pub fn windows_changed(&self) -> bool {
        self.send(CoordinatorEvent::WindowsChanged)
    }

    /// Current character state
    pub async fn snapshot(&self) -> Option<CharacterSnapshot> {
        let (reply, snapshot) = oneshot::channel();
        if !self.send(CoordinatorEvent::Snapshot(reply)) {
            return None;
        }
        snapshot.await.ok()
    }

    /// Stop the loop; active sessions are cancelled
    pub fn shutdown(&self) -> bool {
        self.send(CoordinatorEvent::Shutdown)
    }

    /// Whether the coordinator has stopped
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// The single owner of character state
pub struct Coordinator {
    config: CompanionConfig,
    services: Services,
    machine: BehaviorStateMachine,
    gate: ActionGate,
    speech: SpeechManager,
    media: MediaManager,
    timers: TimerQueue,
    conversation: Option<Conversation>,
    next_conversation: u64,
    /// A speech network failure was already reported since the last success
    network_notice_shown: bool,
    rx: mpsc::UnboundedReceiver<CoordinatorEvent>,
    /// Handed to background tasks; weak so the loop ends when every handle is dropped
    events: mpsc::WeakUnboundedSender<CoordinatorEvent>,
    render_tx: mpsc::UnboundedSender<RenderCommand>,
    renderer_closed: bool,
}

impl Coordinator {
    /// Build the coordinator and its handle
    ///
    /// The character starts idle at the bottom center of the screen. Nothing
    /// happens until [`run`](Self::run) is awaited.
    #[must_use]
    pub fn new(
        config: CompanionConfig,
        services: Services,
        render_tx: mpsc::UnboundedSender<RenderCommand>,
    ) -> (Self, CoordinatorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scanner = EdgeScanner::new(Arc::clone(&services.windows));
        let machine = BehaviorStateMachine::new(scanner, config.behavior_tuning(), Instant::now());

        let coordinator = Self {
            gate: ActionGate::new(config.action_cooldown),
            config,
            services,
            machine,
            speech: SpeechManager::new(),
            media: MediaManager::new(),
            timers: TimerQueue::new(),
            conversation: None,
            next_conversation: 0,
            network_notice_shown: false,
            rx,
            events: tx.downgrade(),
            render_tx,
            renderer_closed: false,
        };
        (coordinator, CoordinatorHandle { tx })
    }

    /// Process events and deadlines until shutdown
    ///
    /// Returns after a [`CoordinatorEvent::Shutdown`], when every handle has
    /// been dropped, or when the renderer hangs up.
    pub async fn run(mut self) {
        tracing::info!(source = %self.config.source(), "Coordinator started");
        self.flush();

        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                biased;
                event = self.rx.recv() => match event {
                    None | Some(CoordinatorEvent::Shutdown) => break,
                    Some(event) => self.handle_event(event, Instant::now()),
                },
                () = wait_until(deadline) => self.on_deadline(Instant::now()),
            }
            self.flush();

            if self.renderer_closed {
                tracing::warn!("Renderer disconnected, stopping coordinator");
                break;
            }
        }

        self.shutdown(Instant::now());
        tracing::info!("Coordinator stopped");
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (self.timers.next_deadline(), self.machine.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn handle_event(&mut self, event: CoordinatorEvent, now: Instant) {
        tracing::trace!(event = ?event, "Event");
        match event {
            CoordinatorEvent::Key { direction, phase } => match phase {
                KeyPhase::Pressed => self.on_key_pressed(direction, now),
                KeyPhase::Released => self.on_key_released(direction, now),
            },
            CoordinatorEvent::Menu { action, reply } => {
                let verdict = self.on_menu(action, now);
                if let Some(reply) = reply {
                    let _ = reply.send(verdict);
                }
            }
            CoordinatorEvent::Speak {
                text,
                duration,
                completion,
            } => {
                self.abort_conversation();
                let voice = self.services.preferences.voice();
                self.speak(text, duration, voice, SpeechOrigin::Direct, completion, now);
            }
            CoordinatorEvent::CancelSpeech => self.cancel_speech(now),
            CoordinatorEvent::Play { uri, completion } => {
                let fallback = self.fallback_source();
                self.play(MediaSource::new(uri), fallback, completion, now);
            }
            CoordinatorEvent::StopMusic => self.stop_music(now),
            CoordinatorEvent::Drag { origin } => {
                self.machine.place_at(origin);
                self.machine.windows_changed(now);
            }
            CoordinatorEvent::WindowsChanged => self.machine.windows_changed(now),
            CoordinatorEvent::SpeechAudio { token, result } => self.on_speech_audio(token, result),
            CoordinatorEvent::MediaStart {
                token,
                stage,
                result,
            } => self.on_media_start(token, stage, result, now),
            CoordinatorEvent::MediaFinished { token, completed } => {
                self.on_media_finished(token, completed, now);
            }
            CoordinatorEvent::Snapshot(reply) => {
                let _ = reply.send(self.machine.snapshot());
            }
            CoordinatorEvent::Shutdown => {}
        }
    }

    fn on_deadline(&mut self, now: Instant) {
        self.machine.advance(now);

        while let Some(kind) = self.timers.pop_due(now) {
            match kind {
                TimerKind::SpeechExpiry(token) => self.on_speech_expired(token, now),
                TimerKind::ConversationAdvance(token) => self.advance_conversation(token, now),
                TimerKind::MovementTick => {
                    if self.machine.has_held_keys() {
                        self.machine.tick_movement(now);
                        self.schedule_movement_tick(now);
                    }
                }
            }
        }
    }

    fn shutdown(&mut self, now: Instant) {
        self.abort_conversation();
        self.cancel_speech(now);
        self.stop_music(now);
        self.flush();
    }

    // ============================================
    // Rendering
    // ============================================

    fn flush(&mut self) {
        for command in self.machine.drain_commands() {
            self.send_render(command);
        }
    }

    /// Send a command after everything the state machine produced so far
    fn emit(&mut self, command: RenderCommand) {
        self.flush();
        self.send_render(command);
    }

    fn send_render(&mut self, command: RenderCommand) {
        if self.render_tx.send(command).is_err() {
            self.renderer_closed = true;
        }
    }

    // ============================================
    // Input
    // ============================================

    fn on_key_pressed(&mut self, direction: Direction, now: Instant) {
        if !self.machine.press_key(direction) {
            tracing::trace!(?direction, "Key repeat ignored");
            return;
        }
        self.machine.tick_movement(now);
        if !self.timers.contains(|k| *k == TimerKind::MovementTick) {
            self.schedule_movement_tick(now);
        }
    }

    fn on_key_released(&mut self, direction: Direction, now: Instant) {
        self.machine.release_key(direction, now);
        if !self.machine.has_held_keys() {
            self.timers.cancel_where(|k| *k == TimerKind::MovementTick);
        }
    }

    fn schedule_movement_tick(&mut self, now: Instant) {
        self.timers
            .schedule(now + self.config.key_repeat_interval(), TimerKind::MovementTick);
    }

    fn on_menu(&mut self, action: MenuAction, now: Instant) -> Result<(), Busy> {
        let permit = match self.gate.try_enter(now) {
            Ok(permit) => permit,
            Err(busy) => {
                tracing::debug!(action = action.name(), "Menu action dropped: busy");
                return Err(busy);
            }
        };

        tracing::info!(action = action.name(), "Menu action");
        self.perform(action, now);
        self.gate.complete(permit, now);
        Ok(())
    }

    fn perform(&mut self, action: MenuAction, now: Instant) {
        match action {
            MenuAction::SpeakGreeting => {
                if let Some(text) = self.services.dialogue.greeting() {
                    self.say(text, now);
                }
            }
            MenuAction::TellJoke => {
                if let Some(text) = self.services.dialogue.joke() {
                    self.say(text, now);
                    self.machine.celebrate(now);
                }
            }
            MenuAction::ShareFact => {
                if let Some(text) = self.services.dialogue.fact() {
                    self.say(text, now);
                }
            }
            MenuAction::StartConversation => self.start_conversation(now),
            MenuAction::SetVoice(voice) => self.set_voice(voice, now),
            MenuAction::PlayTrack => self.play_track(now),
            MenuAction::StopMusic => self.stop_music(now),
            MenuAction::ResetPosition => self.machine.reset_position(now),
            MenuAction::Dance => self.request_state(LocomotionState::Dancing, now),
            MenuAction::Sleep => self.request_state(LocomotionState::Sleeping, now),
            MenuAction::Say(text) => self.say(text, now),
        }
    }

    fn request_state(&mut self, state: LocomotionState, now: Instant) {
        if let Err(err) = self.machine.request_state(state, now) {
            tracing::debug!(error = %err, "State request refused");
        }
    }

    fn set_voice(&mut self, voice: VoiceType, now: Instant) {
        if let Err(err) = self.services.preferences.set_voice(voice) {
            tracing::warn!(error = %err, voice = %voice, "Failed to persist voice");
        }
        self.abort_conversation();
        let sample = DialogueBook::voice_sample(voice);
        let duration = self.config.speech_duration;
        self.speak(sample, duration, voice, SpeechOrigin::Direct, None, now);
    }

    // ============================================
    // Speech
    // ============================================

    /// Menu speech in the persisted voice; ends any conversation
    fn say(&mut self, text: String, now: Instant) {
        self.abort_conversation();
        let voice = self.services.preferences.voice();
        let duration = self.config.speech_duration;
        self.speak(text, duration, voice, SpeechOrigin::Direct, None, now);
    }

    fn speak(
        &mut self,
        text: String,
        duration: Duration,
        voice: VoiceType,
        origin: SpeechOrigin,
        completion: Option<SpeechCompletion>,
        now: Instant,
    ) -> SpeechToken {
        let font_size = self.config.font_size;
        let request = SpeechRequest {
            text: text.clone(),
            duration,
            font_size,
            voice,
            origin,
        };
        let (token, replaced) = self.speech.begin(request, now, completion);
        if let Some(old) = replaced {
            self.release_speech(&old);
        }

        self.timers.schedule(now + duration, TimerKind::SpeechExpiry(token));
        self.emit(RenderCommand::ShowBubble {
            text: text.clone(),
            duration_ms: millis(duration),
            font_size,
        });
        self.machine.report_speech_start(token, now);
        tracing::info!(token = %token, voice = %voice, ?duration, "Speech started");

        self.spawn_synthesis(token, text, voice);
        token
    }

    fn spawn_synthesis(&self, token: SpeechToken, text: String, voice: VoiceType) {
        let Some(events) = self.events.upgrade() else {
            return;
        };
        let synthesizer = Arc::clone(&self.services.synthesizer);
        tokio::spawn(async move {
            let result = synthesizer.synthesize(&text, voice).await;
            let _ = events.send(CoordinatorEvent::SpeechAudio { token, result });
        });
    }

    fn on_speech_audio(&mut self, token: SpeechToken, result: Result<Vec<u8>, SpeechError>) {
        match result {
            Ok(audio) => {
                self.network_notice_shown = false;
                if self.speech.audio_ready(token) == AudioAcceptance::Stale {
                    tracing::debug!(token = %token, "Stale speech audio dropped");
                    return;
                }
                match self.services.audio.play(audio) {
                    Ok(playback) => {
                        if !self.speech.audio_started(token, playback.id) {
                            self.services.audio.stop(playback.id);
                        }
                    }
                    Err(err) => {
                        tracing::warn!(token = %token, error = %err, "Speech audio failed to play");
                        self.speech
                            .audio_failed(token, SpeechError::Playback(err.to_string()));
                    }
                }
            }
            Err(err) => {
                if !self.speech.audio_failed(token, err.clone()) {
                    tracing::debug!(token = %token, "Stale speech failure dropped");
                    return;
                }
                tracing::warn!(token = %token, error = %err, "Speaking without audio");
                if err.is_network() && !self.network_notice_shown {
                    self.network_notice_shown = true;
                    self.emit(RenderCommand::Notice {
                        text: NETWORK_NOTICE.to_string(),
                    });
                }
            }
        }
    }

    fn on_speech_expired(&mut self, token: SpeechToken, now: Instant) {
        let Some(session) = self.speech.finish(token) else {
            tracing::debug!(token = %token, "Stale speech expiry");
            return;
        };
        let origin = session.origin();
        self.end_speech(session, SpeechEnd::Elapsed, now);

        if let SpeechOrigin::Conversation(conversation) = origin {
            self.timers.schedule(
                now + self.config.conversation_gap,
                TimerKind::ConversationAdvance(conversation),
            );
        }
    }

    fn cancel_speech(&mut self, now: Instant) {
        self.abort_conversation();
        if let Some(session) = self.speech.cancel() {
            self.end_speech(session, SpeechEnd::Cancelled, now);
        }
    }

    fn end_speech(&mut self, session: SpeechSession, end: SpeechEnd, now: Instant) {
        let token = session.token();
        self.release_speech(&session);
        self.emit(RenderCommand::HideBubble);
        self.machine.report_speech_end(token, now);

        let outcome = session.complete(end);
        tracing::info!(token = %token, end = ?outcome.end, audio = ?outcome.audio, "Speech ended");
    }

    /// Stop a session's audio and drop its expiry timer
    fn release_speech(&mut self, session: &SpeechSession) {
        let token = session.token();
        self.timers
            .cancel_where(|k| *k == TimerKind::SpeechExpiry(token));
        if let Some(playback) = session.playback() {
            self.services.audio.stop(playback);
        }
    }

    // ============================================
    // Conversations
    // ============================================

    fn start_conversation(&mut self, now: Instant) {
        let Some(lines) = self.services.dialogue.conversation() else {
            return;
        };
        self.abort_conversation();

        self.next_conversation += 1;
        let token = ConversationToken(self.next_conversation);
        let conversation = Conversation::new(token, lines);
        tracing::info!(lines = conversation.len(), "Conversation started");
        self.conversation = Some(conversation);
        self.advance_conversation(token, now);
    }

    fn advance_conversation(&mut self, token: ConversationToken, now: Instant) {
        let Some(conversation) = self
            .conversation
            .as_mut()
            .filter(|c| c.token() == token)
        else {
            tracing::debug!("Stale conversation step");
            return;
        };

        match conversation.next_line() {
            Some((text, duration)) => {
                let voice = self.services.preferences.voice();
                self.speak(
                    text,
                    duration,
                    voice,
                    SpeechOrigin::Conversation(token),
                    None,
                    now,
                );
            }
            None => {
                tracing::info!(lines = conversation.spoken(), "Conversation finished");
                self.conversation = None;
            }
        }
    }

    fn abort_conversation(&mut self) {
        if let Some(conversation) = self.conversation.take() {
            let token = conversation.token();
            self.timers
                .cancel_where(|k| *k == TimerKind::ConversationAdvance(token));
            tracing::debug!(spoken = conversation.spoken(), "Conversation interrupted");
        }
    }

    // ============================================
    // Media
    // ============================================

    fn fallback_source(&self) -> Option<MediaSource> {
        self.config.fallback_track.as_deref().map(MediaSource::new)
    }

    fn play_track(&mut self, now: Instant) {
        let track = self.config.tracks.choose(&mut rand::thread_rng()).cloned();
        match (track, self.fallback_source()) {
            (Some(uri), fallback) => self.play(MediaSource::new(uri), fallback, None, now),
            (None, Some(fallback)) => self.play(fallback, None, None, now),
            (None, None) => {
                tracing::warn!("No tracks configured");
                self.say(NO_TRACKS_LINE.to_string(), now);
            }
        }
    }

    fn play(
        &mut self,
        source: MediaSource,
        fallback: Option<MediaSource>,
        completion: Option<MediaCompletion>,
        now: Instant,
    ) {
        self.stop_music(now);
        let fallback = fallback.filter(|f| *f != source);

        match self.media.begin(source.clone(), fallback, completion) {
            Ok(token) => {
                tracing::info!(token = %token, source = %source, "Media session started");
                self.spawn_media_start(token, MediaStage::Remote, source);
            }
            Err(err) => tracing::warn!(error = %err, "Media session refused"),
        }
    }

    fn spawn_media_start(&self, token: MediaToken, stage: MediaStage, source: MediaSource) {
        let Some(events) = self.events.upgrade() else {
            return;
        };
        let player = Arc::clone(&self.services.media);
        tokio::spawn(async move {
            let result = player.start(&source).await;
            let _ = events.send(CoordinatorEvent::MediaStart {
                token,
                stage,
                result,
            });
        });
    }

    fn spawn_media_watch(&self, token: MediaToken, finished: oneshot::Receiver<bool>) {
        let Some(events) = self.events.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let completed = finished.await.unwrap_or(false);
            let _ = events.send(CoordinatorEvent::MediaFinished { token, completed });
        });
    }

    fn on_media_start(
        &mut self,
        token: MediaToken,
        stage: MediaStage,
        result: Result<Playback, MediaError>,
        now: Instant,
    ) {
        match self.media.on_start_result(token, stage, result) {
            MediaStep::Stale(playback) => {
                tracing::debug!(token = %token, ?stage, "Stale media start dropped");
                if let Some(id) = playback {
                    self.services.media.stop(id);
                }
            }
            MediaStep::Started { token, finished } => {
                tracing::info!(token = %token, ?stage, "Track playing");
                self.machine.report_media_start(token, now);
                self.spawn_media_watch(token, finished);
            }
            MediaStep::RetryWithFallback(source) => {
                self.spawn_media_start(token, MediaStage::Fallback, source);
            }
            MediaStep::Failed(err) => {
                tracing::warn!(token = %token, error = %err, "Track could not be played");
                // A running conversation keeps the bubble
                if self.conversation.is_some() {
                    self.emit(RenderCommand::Notice {
                        text: MEDIA_APOLOGY.to_string(),
                    });
                } else {
                    self.say(MEDIA_APOLOGY.to_string(), now);
                }
            }
        }
    }

    fn on_media_finished(&mut self, token: MediaToken, completed: bool, now: Instant) {
        match self.media.on_finished(token) {
            Some(session) => {
                tracing::info!(token = %token, completed, "Track ended");
                self.machine.report_media_end(session.token(), now);
            }
            None => tracing::debug!(token = %token, "Stale media end"),
        }
    }

    fn stop_music(&mut self, now: Instant) {
        let Some(session) = self.media.stop() else {
            return;
        };
        if let Some(playback) = session.playback() {
            self.services.media.stop(playback);
        }
        tracing::info!(token = %session.token(), "Music stopped");
        self.machine.report_media_end(session.token(), now);
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("machine", &self.machine)
            .field("speech", &self.speech)
            .field("media", &self.media)
            .field("timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
