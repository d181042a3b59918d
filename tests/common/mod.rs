//! Shared test utilities

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use cocina::db::{self, DbPool};
use cocina::voice::{RecognitionErrorKind, SessionEvent, SpeechRecognizer, SpeechSynthesizer};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Call log shared between a scripted adapter and its test
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Recognizer stand-in that records calls instead of touching hardware
pub struct ScriptedRecognizer {
    pub calls: CallLog,
    pub supported: bool,
    pub events: UnboundedSender<SessionEvent>,
    /// When set, `start` immediately reports this error
    pub fail_with: Option<RecognitionErrorKind>,
}

impl ScriptedRecognizer {
    #[must_use]
    pub fn new(events: UnboundedSender<SessionEvent>) -> (Self, CallLog) {
        let calls = CallLog::default();
        let recognizer = Self {
            calls: Arc::clone(&calls),
            supported: true,
            events,
            fail_with: None,
        };
        (recognizer, calls)
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&mut self) {
        self.calls.lock().unwrap().push("start".to_string());
        if let Some(kind) = self.fail_with.clone() {
            let _ = self.events.send(SessionEvent::RecognitionError(kind));
            let _ = self.events.send(SessionEvent::RecognitionEnded);
        }
    }

    fn abort(&mut self) {
        self.calls.lock().unwrap().push("abort".to_string());
    }
}

/// Synthesizer stand-in that records utterances instead of playing audio
pub struct ScriptedSynthesizer {
    pub calls: CallLog,
}

impl ScriptedSynthesizer {
    #[must_use]
    pub fn new() -> (Self, CallLog) {
        let calls = CallLog::default();
        let synthesizer = Self { calls: Arc::clone(&calls) };
        (synthesizer, calls)
    }
}

impl SpeechSynthesizer for ScriptedSynthesizer {
    fn speak(&mut self, text: &str) {
        self.calls.lock().unwrap().push(format!("speak:{text}"));
    }

    fn cancel_all(&mut self) {
        self.calls.lock().unwrap().push("cancel".to_string());
    }
}
