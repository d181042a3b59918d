//! Voice interaction pipeline
//!
//! The pipeline is split into a pure state machine and a set of audio
//! adapters:
//!
//! - [`session`]: session controller. [`session::SessionState`] is a total
//!   transition function over [`session::SessionEvent`]s; [`session::VoiceSession`]
//!   drives it, executing the directives it emits against the adapters.
//! - [`intent`]: maps Spanish transcripts to cooking commands
//! - [`recognizer`]: speech-to-text adapter (microphone capture plus a
//!   Whisper-style transcription API)
//! - [`synthesizer`]: text-to-speech adapter (HTTP synthesis plus local
//!   playback)
//! - [`audio`]: device capture and playback primitives shared by the
//!   adapters

pub mod audio;
pub mod intent;
pub mod recognizer;
pub mod session;
pub mod synthesizer;

pub use intent::{Intent, interpret};
pub use recognizer::{MicRecognizer, RecognitionErrorKind, SpeechRecognizer};
pub use session::{SessionEvent, SessionStatus, VoiceSession};
pub use synthesizer::{HttpSynthesizer, SpeechSynthesizer};
