//! Configuration management for cocina

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::voice::session::RestartDelays;
use crate::{Error, Result};

/// Default STT endpoint (OpenAI-compatible transcription API)
const DEFAULT_STT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Default TTS endpoint (OpenAI-compatible speech API)
const DEFAULT_TTS_ENDPOINT: &str = "https://api.openai.com/v1/audio/speech";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Spoken locale for recognition and announcements
    pub locale: String,

    /// Path to data directory (database lives here)
    pub data_dir: PathBuf,

    /// Voice configuration
    pub voice: VoiceConfig,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable voice input/output
    pub enabled: bool,

    /// STT endpoint URL
    pub stt_endpoint: String,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS endpoint URL
    pub tts_endpoint: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: String,

    /// TTS speed multiplier
    pub tts_speed: f32,

    /// API key shared by the STT and TTS endpoints
    pub api_key: Option<String>,

    /// Delay before re-arming recognition after it ends
    pub restart_delay: Duration,

    /// Delay before resuming recognition after speech output
    pub resume_delay: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stt_endpoint: DEFAULT_STT_ENDPOINT.to_string(),
            stt_model: "whisper-1".to_string(),
            tts_endpoint: DEFAULT_TTS_ENDPOINT.to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            api_key: None,
            restart_delay: Duration::from_millis(250),
            resume_delay: Duration::from_millis(700),
        }
    }
}

impl VoiceConfig {
    /// Session restart delays derived from this config
    #[must_use]
    pub fn restart_delays(&self) -> RestartDelays {
        RestartDelays {
            recognition: self.restart_delay,
            after_speech: self.resume_delay,
        }
    }
}

impl Config {
    /// Load configuration: environment variables override the config file,
    /// which overrides defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the resume delay is not longer than the restart
    /// delay, or if the data directory cannot be created.
    pub fn load() -> Result<Self> {
        Self::load_with_options(false)
    }

    /// Load configuration with voice forcibly disabled when requested
    ///
    /// # Errors
    ///
    /// Returns error if validation fails or the data directory cannot be
    /// created.
    pub fn load_with_options(disable_voice: bool) -> Result<Self> {
        let file = file::load_config_file();
        let defaults = VoiceConfig::default();

        let locale = std::env::var("COCINA_LOCALE")
            .ok()
            .or(file.locale)
            .unwrap_or_else(|| "es-ES".to_string());

        let data_dir = std::env::var("COCINA_DATA_DIR")
            .ok()
            .map(PathBuf::from)
            .or(file.paths.data_dir)
            .unwrap_or_else(default_data_dir);
        std::fs::create_dir_all(&data_dir)?;

        let enabled = !disable_voice
            && std::env::var("COCINA_VOICE")
                .ok()
                .map(|v| v != "0" && v.to_lowercase() != "false")
                .or(file.voice.enabled)
                .unwrap_or(defaults.enabled);

        let api_key = std::env::var("OPENAI_API_KEY").ok().or(file.api_keys.openai);

        let restart_delay = env_millis("COCINA_RESTART_MS")
            .or(file.voice.restart_ms.map(Duration::from_millis))
            .unwrap_or(defaults.restart_delay);

        let resume_delay = env_millis("COCINA_RESUME_MS")
            .or(file.voice.resume_ms.map(Duration::from_millis))
            .unwrap_or(defaults.resume_delay);

        if resume_delay <= restart_delay {
            return Err(Error::Config(format!(
                "resume delay ({resume_delay:?}) must be longer than restart delay ({restart_delay:?})"
            )));
        }

        #[allow(clippy::cast_possible_truncation)]
        let tts_speed = file.voice.tts_speed.map_or(defaults.tts_speed, |s| s as f32);

        let voice = VoiceConfig {
            enabled,
            stt_endpoint: std::env::var("COCINA_STT_ENDPOINT")
                .ok()
                .or(file.voice.stt_endpoint)
                .unwrap_or(defaults.stt_endpoint),
            stt_model: std::env::var("COCINA_STT_MODEL")
                .ok()
                .or(file.voice.stt_model)
                .unwrap_or(defaults.stt_model),
            tts_endpoint: std::env::var("COCINA_TTS_ENDPOINT")
                .ok()
                .or(file.voice.tts_endpoint)
                .unwrap_or(defaults.tts_endpoint),
            tts_model: std::env::var("COCINA_TTS_MODEL")
                .ok()
                .or(file.voice.tts_model)
                .unwrap_or(defaults.tts_model),
            tts_voice: std::env::var("COCINA_TTS_VOICE")
                .ok()
                .or(file.voice.tts_voice)
                .unwrap_or(defaults.tts_voice),
            tts_speed,
            api_key,
            restart_delay,
            resume_delay,
        };

        Ok(Self { locale, data_dir, voice })
    }

    /// Path to the `SQLite` database file
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("cocina.db")
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}

/// Default data directory: `~/.local/share/cocina/` on Linux
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/cocina"),
        |d| d.data_dir().join("cocina"),
    )
}
