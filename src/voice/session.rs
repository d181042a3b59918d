//! Voice session controller
//!
//! Coordinates speech recognition and speech synthesis so the microphone
//! is never open while the synthesizer is speaking, and listening resumes
//! automatically after an utterance or a finished recognition cycle.
//!
//! The controller is split in two layers:
//!
//! - [`SessionState`] is a pure state machine: a total transition function
//!   from `(state, SessionEvent)` to a list of [`Directive`]s. Every claim
//!   on the microphone/speaker pair is a single [`ResourceClaim`] value,
//!   so no invalid flag combination can be represented.
//! - [`VoiceSession`] is the async driver: it executes directives against
//!   the two adapters and keeps at most one pending restart timer,
//!   cancelling and replacing it on every new scheduling request.
//!
//! Adapter failures never propagate to the caller; the only externally
//! visible failure signal is [`SessionStatus`].

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::recognizer::{RecognitionErrorKind, SpeechRecognizer};
use super::synthesizer::SpeechSynthesizer;

/// Externally observable session status. Exactly one holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Neither capability is active
    Idle,
    /// The recognizer is capturing speech
    Listening,
    /// The synthesizer is speaking
    Speaking,
    /// A transcript is being handled by the command handler
    Processing,
    /// Recognition is unavailable (unsupported runtime or permission denied)
    Error,
}

/// Exclusive claim over the microphone/speaker pair.
///
/// Replaces ad hoc `is_starting`/`is_listening`/`is_speaking` flags with a
/// single sum type mutated only by the session's own transition function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClaim {
    /// Neither channel is claimed
    Free,
    /// A recognition start has been requested but not yet confirmed
    Starting,
    /// The recognizer holds the microphone
    Listening,
    /// The synthesizer holds the speaker
    Speaking,
}

/// Which delay applies to a scheduled listening restart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// Recognition cycle ended; short debounce before re-arming
    RecognitionEnded,
    /// An utterance finished; longer delay so the audio hardware settles
    /// and the tail of the synthesized speech is not captured
    SpeechFinished,
}

/// Discrete events consumed by the session's transition function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Caller enabled the session
    Enable,
    /// Caller disabled the session
    Disable,
    /// Caller requested an utterance
    Speak(String),
    /// The recognizer confirmed it is capturing
    RecognitionStarted,
    /// The recognizer produced a final transcript
    RecognitionResult(String),
    /// The recognizer failed
    RecognitionError(RecognitionErrorKind),
    /// The recognition cycle ended
    RecognitionEnded,
    /// The synthesizer began an utterance
    UtteranceStarted,
    /// The utterance ended, by completion or by error
    UtteranceFinished,
    /// A scheduled restart delay elapsed
    RestartElapsed,
}

/// Side effects the driver must perform after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Request the recognizer to begin listening
    StartRecognition,
    /// Abort any in-progress recognition
    AbortRecognition,
    /// Begin synthesizing the given text
    BeginUtterance(String),
    /// Cancel any in-flight utterance
    CancelUtterance,
    /// Schedule a listening restart; any pending restart is cancelled first
    ScheduleRestart(RestartReason),
    /// Cancel the pending restart, if any
    CancelRestart,
    /// Deliver a transcript to the command handler
    HandleTranscript(String),
}

/// Pure session state machine
#[derive(Debug)]
pub struct SessionState {
    status: SessionStatus,
    enabled: bool,
    claim: ResourceClaim,
    /// Recognition is unavailable in this runtime; terminal for the session
    supported: bool,
    /// Microphone permission was denied; terminal until re-enabled
    permission_denied: bool,
    /// Whether a restart is currently scheduled (mirror of the driver's
    /// timer handle, kept so invariants are checkable on the pure machine)
    restart_pending: bool,
}

impl SessionState {
    /// Create a session for a runtime where recognition is available
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            enabled: false,
            claim: ResourceClaim::Free,
            supported: true,
            permission_denied: false,
            restart_pending: false,
        }
    }

    /// Create a session for a runtime without speech recognition.
    ///
    /// The status is `Error` for the whole session; no event changes it.
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            status: SessionStatus::Error,
            supported: false,
            ..Self::new()
        }
    }

    /// Current externally observable status
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Whether the caller has enabled the session
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current resource claim
    #[must_use]
    pub const fn claim(&self) -> ResourceClaim {
        self.claim
    }

    /// Whether a restart is currently scheduled
    #[must_use]
    pub const fn restart_pending(&self) -> bool {
        self.restart_pending
    }

    /// Apply an event and return the directives the driver must execute.
    ///
    /// Total over every `(state, event)` pair; events that do not apply in
    /// the current state (late adapter callbacks after a disable, duplicate
    /// enables) produce no directives rather than an error.
    pub fn apply(&mut self, event: SessionEvent) -> Vec<Directive> {
        // Recognition missing from the runtime: the error status is
        // permanent and the machine is inert.
        if !self.supported {
            if matches!(event, SessionEvent::Disable) {
                self.enabled = false;
            }
            return Vec::new();
        }

        match event {
            SessionEvent::Enable => self.on_enable(),
            SessionEvent::Disable => self.on_disable(),
            SessionEvent::Speak(text) => self.on_speak(text),
            SessionEvent::RecognitionStarted => {
                if self.enabled && self.claim == ResourceClaim::Starting {
                    self.claim = ResourceClaim::Listening;
                    self.status = SessionStatus::Listening;
                }
                Vec::new()
            }
            SessionEvent::RecognitionResult(transcript) => {
                if self.enabled && self.claim == ResourceClaim::Listening {
                    self.status = SessionStatus::Processing;
                    vec![Directive::HandleTranscript(transcript)]
                } else {
                    Vec::new()
                }
            }
            SessionEvent::RecognitionError(kind) => self.on_recognition_error(kind),
            SessionEvent::RecognitionEnded => self.on_recognition_ended(),
            SessionEvent::UtteranceStarted => {
                if self.enabled {
                    self.claim = ResourceClaim::Speaking;
                    // A denied session keeps reporting Error through the
                    // utterance; the status is a persistent indicator.
                    if !self.permission_denied {
                        self.status = SessionStatus::Speaking;
                    }
                }
                Vec::new()
            }
            SessionEvent::UtteranceFinished => self.on_utterance_finished(),
            SessionEvent::RestartElapsed => self.on_restart_elapsed(),
        }
    }

    fn on_enable(&mut self) -> Vec<Directive> {
        self.permission_denied = false;
        if self.enabled {
            // Idempotent: never create a duplicate listening session
            return Vec::new();
        }
        self.enabled = true;
        if self.claim == ResourceClaim::Free {
            self.claim = ResourceClaim::Starting;
            vec![Directive::StartRecognition]
        } else {
            Vec::new()
        }
    }

    fn on_disable(&mut self) -> Vec<Directive> {
        self.enabled = false;
        self.restart_pending = false;
        let mut directives = vec![Directive::CancelRestart];
        match self.claim {
            ResourceClaim::Starting | ResourceClaim::Listening => {
                directives.push(Directive::AbortRecognition);
            }
            ResourceClaim::Speaking => directives.push(Directive::CancelUtterance),
            ResourceClaim::Free => {}
        }
        self.claim = ResourceClaim::Free;
        self.status = SessionStatus::Idle;
        directives
    }

    fn on_speak(&mut self, text: String) -> Vec<Directive> {
        let mut directives = Vec::new();
        // Mutual exclusion: recognition is aborted before any other side
        // effect, so the recognizer can never hear the utterance.
        if matches!(self.claim, ResourceClaim::Starting | ResourceClaim::Listening) {
            directives.push(Directive::AbortRecognition);
        }
        self.restart_pending = false;
        directives.push(Directive::CancelRestart);
        directives.push(Directive::CancelUtterance);
        directives.push(Directive::BeginUtterance(text));
        self.claim = ResourceClaim::Speaking;
        directives
    }

    fn on_recognition_error(&mut self, kind: RecognitionErrorKind) -> Vec<Directive> {
        if self.claim == ResourceClaim::Speaking {
            // Late callback from an already-aborted recognition
            return Vec::new();
        }
        match kind {
            RecognitionErrorKind::NoSpeech => {
                // Silence is expected, not a failure
                self.claim = ResourceClaim::Free;
                if self.enabled {
                    self.status = SessionStatus::Idle;
                }
            }
            RecognitionErrorKind::NotAllowed => {
                self.claim = ResourceClaim::Free;
                self.permission_denied = true;
                self.status = SessionStatus::Error;
            }
            RecognitionErrorKind::AlreadyActive => {
                // The adapter reports a live recognition; sync to it instead
                // of surfacing an error
                self.claim = ResourceClaim::Listening;
                if self.enabled {
                    self.status = SessionStatus::Listening;
                }
            }
            RecognitionErrorKind::Unsupported => {
                self.supported = false;
                self.claim = ResourceClaim::Free;
                self.status = SessionStatus::Error;
            }
            RecognitionErrorKind::Other(_) => {
                self.claim = ResourceClaim::Free;
                if self.enabled {
                    self.status = SessionStatus::Idle;
                }
            }
        }
        Vec::new()
    }

    fn on_recognition_ended(&mut self) -> Vec<Directive> {
        if self.claim == ResourceClaim::Speaking {
            // The recognition was aborted by a speak call; the utterance
            // path owns the resumption schedule.
            return Vec::new();
        }
        self.claim = ResourceClaim::Free;
        if !self.enabled {
            self.status = SessionStatus::Idle;
            return Vec::new();
        }
        if self.permission_denied || self.status == SessionStatus::Error {
            return Vec::new();
        }
        self.status = SessionStatus::Idle;
        self.restart_pending = true;
        vec![
            Directive::CancelRestart,
            Directive::ScheduleRestart(RestartReason::RecognitionEnded),
        ]
    }

    fn on_utterance_finished(&mut self) -> Vec<Directive> {
        if self.claim != ResourceClaim::Speaking {
            return Vec::new();
        }
        self.claim = ResourceClaim::Free;
        if !self.enabled {
            self.status = SessionStatus::Idle;
            return Vec::new();
        }
        if self.permission_denied {
            self.status = SessionStatus::Error;
            return Vec::new();
        }
        self.status = SessionStatus::Idle;
        self.restart_pending = true;
        vec![
            Directive::CancelRestart,
            Directive::ScheduleRestart(RestartReason::SpeechFinished),
        ]
    }

    fn on_restart_elapsed(&mut self) -> Vec<Directive> {
        self.restart_pending = false;
        if self.enabled && self.claim == ResourceClaim::Free && !self.permission_denied {
            self.claim = ResourceClaim::Starting;
            vec![Directive::StartRecognition]
        } else {
            Vec::new()
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// At most one pending listening restart; scheduling cancels any
/// previous handle before creating a new one.
#[derive(Debug, Default)]
struct RestartTimer {
    handle: Option<JoinHandle<()>>,
}

impl RestartTimer {
    fn schedule(&mut self, tx: mpsc::UnboundedSender<SessionEvent>, delay: Duration) {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionEvent::RestartElapsed);
        }));
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for RestartTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Delays for re-arming listening
#[derive(Debug, Clone, Copy)]
pub struct RestartDelays {
    /// Debounce after a recognition cycle ends
    pub recognition: Duration,
    /// Settle time after an utterance finishes; longer than `recognition`
    pub after_speech: Duration,
}

impl Default for RestartDelays {
    fn default() -> Self {
        Self {
            recognition: Duration::from_millis(250),
            after_speech: Duration::from_millis(700),
        }
    }
}

/// Async driver for the session state machine.
///
/// Owns the two adapters and the single pending restart timer. Callers feed
/// it adapter events from the shared channel and their own control calls;
/// interpreted transcripts are handed back synchronously from [`Self::process`]
/// so the caller's state mutation completes before the next listening cycle.
pub struct VoiceSession {
    state: SessionState,
    recognizer: Box<dyn SpeechRecognizer>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    restart: RestartTimer,
    events: mpsc::UnboundedSender<SessionEvent>,
    delays: RestartDelays,
}

impl VoiceSession {
    /// Create the event channel shared by the session and its adapters
    #[must_use]
    pub fn channel() -> (
        mpsc::UnboundedSender<SessionEvent>,
        mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        mpsc::unbounded_channel()
    }

    /// Create a new session driver.
    ///
    /// `events` must be the sender half of the channel whose receiver the
    /// caller drains into [`Self::process`].
    #[must_use]
    pub fn new(
        recognizer: Box<dyn SpeechRecognizer>,
        synthesizer: Box<dyn SpeechSynthesizer>,
        events: mpsc::UnboundedSender<SessionEvent>,
        delays: RestartDelays,
    ) -> Self {
        let state = if recognizer.is_supported() {
            SessionState::new()
        } else {
            SessionState::unsupported()
        };

        Self {
            state,
            recognizer,
            synthesizer,
            restart: RestartTimer::default(),
            events,
            delays,
        }
    }

    /// Current externally observable status
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.state.status()
    }

    /// Enable the session and start listening
    pub fn enable(&mut self) {
        self.process(SessionEvent::Enable);
    }

    /// Disable the session: cancel the pending restart, abort recognition,
    /// cancel any utterance, report idle
    pub fn disable(&mut self) {
        self.process(SessionEvent::Disable);
    }

    /// Speak the given text, aborting any active recognition first
    pub fn speak(&mut self, text: &str) {
        self.process(SessionEvent::Speak(text.to_string()));
    }

    /// Apply one event and execute the resulting directives.
    ///
    /// Returns a transcript when this event carried a final recognition
    /// result; the caller handles it before feeding the next event, which
    /// keeps command handling synchronous with the `Processing` status.
    pub fn process(&mut self, event: SessionEvent) -> Option<String> {
        let mut transcript = None;
        for directive in self.state.apply(event) {
            match directive {
                Directive::StartRecognition => self.recognizer.start(),
                Directive::AbortRecognition => self.recognizer.abort(),
                Directive::BeginUtterance(text) => self.synthesizer.speak(&text),
                Directive::CancelUtterance => self.synthesizer.cancel_all(),
                Directive::ScheduleRestart(reason) => {
                    let delay = match reason {
                        RestartReason::RecognitionEnded => self.delays.recognition,
                        RestartReason::SpeechFinished => self.delays.after_speech,
                    };
                    self.restart.schedule(self.events.clone(), delay);
                }
                Directive::CancelRestart => self.restart.cancel(),
                Directive::HandleTranscript(text) => transcript = Some(text),
            }
        }
        if let Some(ref text) = transcript {
            tracing::debug!(transcript = %text, "transcript ready for handling");
        }
        transcript
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.restart.cancel();
        self.recognizer.abort();
        self.synthesizer.cancel_all();
    }
}
