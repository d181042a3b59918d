//! Speech recognition adapter
//!
//! A recognizer is fire-and-forget: `start` and `abort` return immediately
//! and all outcomes arrive later as [`SessionEvent`]s on the session's
//! channel. One `start` covers exactly one utterance (single-shot,
//! final-result-only); the controller re-arms it between cycles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::audio::{CAPTURE_SAMPLE_RATE, MicCapture, rms_energy, samples_to_wav};
use super::session::SessionEvent;
use crate::{Error, Result};

/// Why a recognition attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// No speech was detected before the timeout; expected during quiet
    /// stretches, not a failure
    NoSpeech,
    /// Microphone permission denied
    NotAllowed,
    /// Start was requested while a recognition is already active
    AlreadyActive,
    /// The runtime has no speech recognition capability
    Unsupported,
    /// Anything else (device errors, transcription API failures)
    Other(String),
}

/// Source of recognition events
pub trait SpeechRecognizer: Send {
    /// Whether recognition is available at all in this runtime.
    ///
    /// Checked once when the session is created; `false` makes the whole
    /// session report a permanent error status.
    fn is_supported(&self) -> bool;

    /// Begin one recognition attempt. Must tolerate being called while an
    /// attempt is already active (reported as an `AlreadyActive` error
    /// event, which the session absorbs).
    fn start(&mut self);

    /// Abort the active recognition attempt, if any
    fn abort(&mut self);
}

/// Energy threshold above which a block counts as speech
const SPEECH_THRESHOLD: f32 = 0.02;

/// How long to wait for speech before reporting no-speech
const NO_SPEECH_TIMEOUT: Duration = Duration::from_secs(6);

/// Trailing silence that ends an utterance
const TRAILING_SILENCE: Duration = Duration::from_millis(700);

/// Hard cap on a single utterance
const MAX_UTTERANCE: Duration = Duration::from_secs(10);

/// Poll interval for the capture buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of the blocking capture phase
enum CaptureOutcome {
    Utterance(Vec<f32>),
    NoSpeech,
    Cancelled,
    Failed(Error),
}

/// Microphone recognizer: captures one utterance segmented by RMS energy,
/// then transcribes it through a Whisper-style HTTP endpoint.
pub struct MicRecognizer {
    events: UnboundedSender<SessionEvent>,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    locale: String,
    supported: bool,
    cancel: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl MicRecognizer {
    /// Create a microphone recognizer.
    ///
    /// Availability of an input device is checked once here; without one
    /// the recognizer still constructs, but reports itself as unsupported.
    #[must_use]
    pub fn new(
        events: UnboundedSender<SessionEvent>,
        endpoint: String,
        api_key: String,
        model: String,
        locale: String,
    ) -> Self {
        let supported = match MicCapture::new() {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "speech recognition unavailable");
                false
            }
        };

        Self {
            events,
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
            locale,
            supported,
            cancel: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Capture one utterance from the microphone, blocking.
    ///
    /// Waits up to [`NO_SPEECH_TIMEOUT`] for speech to begin, then
    /// accumulates until [`TRAILING_SILENCE`] of quiet or [`MAX_UTTERANCE`].
    fn capture_utterance(cancel: &AtomicBool) -> CaptureOutcome {
        let mut capture = match MicCapture::new() {
            Ok(c) => c,
            Err(e) => return CaptureOutcome::Failed(e),
        };
        if let Err(e) = capture.start() {
            return CaptureOutcome::Failed(e);
        }

        let started = std::time::Instant::now();
        let mut utterance: Vec<f32> = Vec::new();
        let mut in_speech = false;
        let mut silence_samples = 0usize;

        let silence_limit =
            (CAPTURE_SAMPLE_RATE as u128 * TRAILING_SILENCE.as_millis() / 1000) as usize;

        loop {
            if cancel.load(Ordering::Relaxed) {
                capture.stop();
                return CaptureOutcome::Cancelled;
            }

            std::thread::sleep(POLL_INTERVAL);
            let block = capture.take_buffer();
            let is_speech = rms_energy(&block) > SPEECH_THRESHOLD;

            if in_speech {
                utterance.extend_from_slice(&block);
                if is_speech {
                    silence_samples = 0;
                } else {
                    silence_samples += block.len();
                }
                if silence_samples >= silence_limit || started.elapsed() > MAX_UTTERANCE {
                    capture.stop();
                    return CaptureOutcome::Utterance(utterance);
                }
            } else if is_speech {
                in_speech = true;
                utterance.extend_from_slice(&block);
            } else if started.elapsed() > NO_SPEECH_TIMEOUT {
                capture.stop();
                return CaptureOutcome::NoSpeech;
            }
        }
    }

    /// Transcribe WAV audio through the configured endpoint
    async fn transcribe(
        client: &reqwest::Client,
        endpoint: &str,
        api_key: &str,
        model: &str,
        locale: &str,
        wav: Vec<u8>,
    ) -> Result<String> {
        #[derive(serde::Deserialize)]
        struct TranscriptionResponse {
            text: String,
        }

        let language = locale.split('-').next().unwrap_or(locale).to_string();

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("utterance.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", model.to_string())
            .text("language", language);

        let response = client
            .post(endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("transcription API error {status}: {body}")));
        }

        let result: TranscriptionResponse = response.json().await?;
        Ok(result.text)
    }

    fn classify_error(e: &Error) -> RecognitionErrorKind {
        let text = e.to_string().to_lowercase();
        if text.contains("permission") || text.contains("access denied") {
            RecognitionErrorKind::NotAllowed
        } else {
            RecognitionErrorKind::Other(e.to_string())
        }
    }
}

impl SpeechRecognizer for MicRecognizer {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&mut self) {
        if !self.supported {
            let _ = self
                .events
                .send(SessionEvent::RecognitionError(RecognitionErrorKind::Unsupported));
            return;
        }

        if let Some(task) = &self.task
            && !task.is_finished()
        {
            let _ = self
                .events
                .send(SessionEvent::RecognitionError(RecognitionErrorKind::AlreadyActive));
            return;
        }

        // Each attempt gets its own cancel token; an aborted capture keeps
        // polling the old one from its blocking thread, so resetting a
        // shared flag would revive it alongside the new attempt.
        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = Arc::clone(&cancel);
        let events = self.events.clone();
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let model = self.model.clone();
        let locale = self.locale.clone();

        self.task = Some(tokio::spawn(async move {
            let _ = events.send(SessionEvent::RecognitionStarted);

            let capture_cancel = Arc::clone(&cancel);
            let outcome =
                tokio::task::spawn_blocking(move || Self::capture_utterance(&capture_cancel))
                    .await
                    .unwrap_or(CaptureOutcome::Cancelled);

            match outcome {
                CaptureOutcome::Utterance(samples) => {
                    let result = samples_to_wav(&samples, CAPTURE_SAMPLE_RATE);
                    match result {
                        Ok(wav) => {
                            match Self::transcribe(&client, &endpoint, &api_key, &model, &locale, wav)
                                .await
                            {
                                Ok(text) if !cancel.load(Ordering::Relaxed) => {
                                    let transcript = text.to_lowercase();
                                    tracing::info!(transcript = %transcript, "transcription complete");
                                    let _ =
                                        events.send(SessionEvent::RecognitionResult(transcript));
                                }
                                Ok(_) => {}
                                Err(e) => {
                                    tracing::warn!(error = %e, "transcription failed");
                                    let _ = events.send(SessionEvent::RecognitionError(
                                        Self::classify_error(&e),
                                    ));
                                }
                            }
                        }
                        Err(e) => {
                            let _ = events.send(SessionEvent::RecognitionError(
                                Self::classify_error(&e),
                            ));
                        }
                    }
                }
                CaptureOutcome::NoSpeech => {
                    let _ = events
                        .send(SessionEvent::RecognitionError(RecognitionErrorKind::NoSpeech));
                }
                CaptureOutcome::Cancelled => {}
                CaptureOutcome::Failed(e) => {
                    let _ = events.send(SessionEvent::RecognitionError(Self::classify_error(&e)));
                }
            }

            let _ = events.send(SessionEvent::RecognitionEnded);
        }));
    }

    fn abort(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.task.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognizer() -> (MicRecognizer, tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let recognizer = MicRecognizer::new(
            tx,
            "http://127.0.0.1:9/v1/audio/transcriptions".to_string(),
            "test-key".to_string(),
            "whisper-1".to_string(),
            "es-ES".to_string(),
        );
        (recognizer, rx)
    }

    #[tokio::test]
    async fn test_restart_gets_fresh_cancel_token() {
        let (mut recognizer, _rx) = recognizer();
        // Exercise token handling regardless of local audio hardware
        recognizer.supported = true;

        recognizer.start();
        let first = Arc::clone(&recognizer.cancel);
        assert!(!first.load(Ordering::Relaxed));

        recognizer.abort();
        assert!(first.load(Ordering::Relaxed));

        // A quick re-arm must not revive the aborted capture's token
        recognizer.start();
        assert!(first.load(Ordering::Relaxed));
        assert!(!Arc::ptr_eq(&first, &recognizer.cancel));
        assert!(!recognizer.cancel.load(Ordering::Relaxed));

        recognizer.abort();
    }
}
