//! Speech synthesis adapter
//!
//! A synthesizer enqueues one utterance at a time and reports its
//! lifecycle as [`SessionEvent`]s: `UtteranceStarted` when audio begins,
//! `UtteranceFinished` when playback ends or fails. `cancel_all` stops
//! playback silently, with no terminal event, because the session has
//! already moved on by the time a cancel is issued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::audio::SpeakerOutput;
use super::session::SessionEvent;
use crate::{Error, Result};

/// Sink for spoken output
pub trait SpeechSynthesizer: Send {
    /// Synthesize and play one utterance. Returns immediately; progress
    /// arrives as events.
    fn speak(&mut self, text: &str);

    /// Stop any in-flight utterance without emitting a finish event
    fn cancel_all(&mut self);
}

/// HTTP text-to-speech synthesizer: fetches MP3 audio from an
/// OpenAI-style `/v1/audio/speech` endpoint and plays it on the default
/// output device.
pub struct HttpSynthesizer {
    events: UnboundedSender<SessionEvent>,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    voice: String,
    speed: f32,
    cancel: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl HttpSynthesizer {
    #[must_use]
    pub fn new(
        events: UnboundedSender<SessionEvent>,
        endpoint: String,
        api_key: String,
        model: String,
        voice: String,
        speed: f32,
    ) -> Self {
        Self {
            events,
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
            voice,
            speed,
            cancel: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Fetch MP3 audio for the given text
    async fn synthesize(
        client: &reqwest::Client,
        endpoint: &str,
        api_key: &str,
        model: &str,
        voice: &str,
        speed: f32,
        text: &str,
    ) -> Result<Vec<u8>> {
        let body = serde_json::json!({
            "model": model,
            "input": text,
            "voice": voice,
            "speed": speed,
            "response_format": "mp3",
        });

        let response = client
            .post(endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("speech API error {status}: {detail}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

impl SpeechSynthesizer for HttpSynthesizer {
    fn speak(&mut self, text: &str) {
        // A new utterance replaces any in-flight one. The cancelled token
        // stays with the old playback, which polls it from a blocking
        // thread that outlives the task abort; reusing it would revive
        // that playback.
        self.cancel_all();

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = Arc::clone(&cancel);
        let events = self.events.clone();
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let model = self.model.clone();
        let voice = self.voice.clone();
        let speed = self.speed;
        let text = text.to_string();

        self.task = Some(tokio::spawn(async move {
            let audio =
                Self::synthesize(&client, &endpoint, &api_key, &model, &voice, speed, &text).await;

            match audio {
                Ok(mp3) => {
                    if cancel.load(Ordering::Relaxed) {
                        return;
                    }
                    let _ = events.send(SessionEvent::UtteranceStarted);

                    let play_cancel = Arc::clone(&cancel);
                    let result = tokio::task::spawn_blocking(move || {
                        let speaker = SpeakerOutput::new()?;
                        speaker.play_mp3(&mp3, &play_cancel)
                    })
                    .await;

                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => tracing::warn!(error = %e, "playback failed"),
                        Err(e) => tracing::warn!(error = %e, "playback task panicked"),
                    }

                    if !cancel.load(Ordering::Relaxed) {
                        let _ = events.send(SessionEvent::UtteranceFinished);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "speech synthesis failed");
                    // Report start and finish so the session still cycles
                    // back to listening after a failed fetch.
                    if !cancel.load(Ordering::Relaxed) {
                        let _ = events.send(SessionEvent::UtteranceStarted);
                        let _ = events.send(SessionEvent::UtteranceFinished);
                    }
                }
            }
        }));
    }

    fn cancel_all(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthesizer() -> (HttpSynthesizer, tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let synth = HttpSynthesizer::new(
            tx,
            "http://127.0.0.1:9/v1/audio/speech".to_string(),
            "test-key".to_string(),
            "tts-1".to_string(),
            "alloy".to_string(),
            1.0,
        );
        (synth, rx)
    }

    #[tokio::test]
    async fn test_new_utterance_gets_fresh_cancel_token() {
        let (mut synth, _rx) = synthesizer();

        synth.speak("primera frase");
        let first = Arc::clone(&synth.cancel);
        assert!(!first.load(Ordering::Relaxed));

        synth.speak("segunda frase");
        // The replaced utterance keeps its cancelled token; the new one
        // starts on a separate, uncancelled token.
        assert!(first.load(Ordering::Relaxed));
        assert!(!Arc::ptr_eq(&first, &synth.cancel));
        assert!(!synth.cancel.load(Ordering::Relaxed));

        synth.cancel_all();
        assert!(synth.cancel.load(Ordering::Relaxed));
        assert!(first.load(Ordering::Relaxed));
    }
}
