//! Microphone capture and speaker playback

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for capture (16kHz mono, standard for speech)
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Sample rate for playback (matches common TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Accumulates microphone samples from the default input device
pub struct MicCapture {
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl MicCapture {
    /// Open the default input device at the capture sample rate
    ///
    /// # Errors
    ///
    /// Returns error if no input device is available or no mono 16kHz
    /// configuration exists
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(CAPTURE_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(CAPTURE_SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable capture config found".to_string()))?;

        let config = supported.with_sample_rate(SampleRate(CAPTURE_SAMPLE_RATE)).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = CAPTURE_SAMPLE_RATE,
            "microphone opened"
        );

        Ok(Self {
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Begin capturing into the internal buffer
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "capture stream error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop capturing
    pub fn stop(&mut self) {
        self.stream.take();
    }

    /// Take and clear the samples captured since the last call
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

}

/// RMS energy of a block of samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Encode f32 samples as 16-bit mono WAV for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;
        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }
        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Plays MP3 audio through the default output device
pub struct SpeakerOutput {
    config: StreamConfig,
}

impl SpeakerOutput {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device or configuration is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() <= 2
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported.with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE)).config();

        Ok(Self { config })
    }

    /// Decode and play MP3 data, blocking until playback completes or
    /// `cancelled` becomes true.
    ///
    /// # Errors
    ///
    /// Returns error if decoding fails or the output stream cannot be built
    pub fn play_mp3(&self, mp3_data: &[u8], cancelled: &AtomicBool) -> Result<()> {
        let samples = decode_mp3(mp3_data)?;
        self.play_samples(&samples, cancelled)
    }

    /// Play f32 samples, blocking until playback completes or `cancelled`
    /// becomes true.
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be built or started
    pub fn play_samples(&self, samples: &[f32], cancelled: &AtomicBool) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let channels = self.config.channels as usize;
        let queue: Arc<Mutex<(Vec<f32>, usize)>> =
            Arc::new(Mutex::new((samples.to_vec(), 0)));
        let finished = Arc::new(AtomicBool::new(false));

        let queue_cb = Arc::clone(&queue);
        let finished_cb = Arc::clone(&finished);

        let stream = device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut guard) = queue_cb.lock() else { return };
                    let (samples, pos) = &mut *guard;
                    for frame in data.chunks_mut(channels) {
                        let value = if *pos < samples.len() {
                            let v = samples[*pos];
                            *pos += 1;
                            v
                        } else {
                            finished_cb.store(true, Ordering::Relaxed);
                            0.0
                        };
                        for out in frame.iter_mut() {
                            *out = value;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "playback stream error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let duration_ms = (samples.len() as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let deadline =
            std::time::Instant::now() + std::time::Duration::from_millis(duration_ms + 500);

        while !finished.load(Ordering::Relaxed) && !cancelled.load(Ordering::Relaxed) {
            if std::time::Instant::now() > deadline {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        drop(stream);
        Ok(())
    }
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_energy() {
        assert!(rms_energy(&[]) < f32::EPSILON);
        assert!(rms_energy(&vec![0.0; 160]) < 0.001);
        assert!(rms_energy(&vec![0.5; 160]) > 0.4);
    }

    #[test]
    fn test_samples_to_wav_header() {
        let wav = samples_to_wav(&vec![0.0; 160], CAPTURE_SAMPLE_RATE).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 160 samples at 16 bits = 320 data bytes plus the 44-byte header
        assert_eq!(wav.len(), 364);
    }
}
