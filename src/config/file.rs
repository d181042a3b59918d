//! TOML configuration file loading
//!
//! Supports `~/.config/cocina/config.toml` as a persistent config source.
//! All fields are optional, the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct CocinaConfigFile {
    /// Spoken locale (e.g. "es-ES")
    #[serde(default)]
    pub locale: Option<String>,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Runtime paths
    #[serde(default)]
    pub paths: PathsFileConfig,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable voice input/output
    pub enabled: Option<bool>,

    /// STT endpoint URL
    pub stt_endpoint: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS endpoint URL
    pub tts_endpoint: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f64>,

    /// Delay before re-arming recognition after it ends, in milliseconds
    pub restart_ms: Option<u64>,

    /// Delay before resuming recognition after speech, in milliseconds
    pub resume_ms: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
}

/// Runtime path configuration
#[derive(Debug, Default, Deserialize)]
pub struct PathsFileConfig {
    /// Data directory (database lives here)
    pub data_dir: Option<PathBuf>,
}

/// Load the config file, falling back to defaults on any failure
pub fn load_config_file() -> CocinaConfigFile {
    let Some(path) = config_file_path() else {
        return CocinaConfigFile::default();
    };

    if !path.exists() {
        return CocinaConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                CocinaConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            CocinaConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/cocina/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("cocina").join("config.toml"))
}
