//! Audio capture from microphone

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use super::clip::{AudioClip, write_wav};
use crate::{Error, Result};

/// Sample rate for speech capture (16kHz)
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Captures audio from the default input device
pub struct AudioCapture {
    config: StreamConfig,
    sample_rate: u32,
}

impl AudioCapture {
    /// Create a capture instance for the default input device
    ///
    /// # Errors
    ///
    /// Returns `Error::Device` if no input device is available or no mono
    /// config supports the requested rate
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Device("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Device(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .ok_or_else(|| Error::Device("no suitable input config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            config,
            sample_rate,
        })
    }

    /// Record from the microphone for `duration` and write a 16-bit mono WAV
    ///
    /// Blocks until the recording window has elapsed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Device` if the input stream cannot be opened, or an
    /// IO error if the file cannot be written
    pub fn record(&self, duration: Duration, output: &Path) -> Result<AudioClip> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Device("no input device".to_string()))?;

        let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
        let writer = Arc::clone(&buffer);

        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = writer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Device(e.to_string()))?;

        tracing::info!(secs = duration.as_secs_f32(), "capturing audio");
        stream.play().map_err(|e| Error::Device(e.to_string()))?;
        std::thread::sleep(duration);
        drop(stream);

        let samples = buffer
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default();

        let clip = write_wav(&samples, self.sample_rate, output)?;
        tracing::info!(
            path = %clip.path.display(),
            samples = samples.len(),
            "audio captured"
        );
        Ok(clip)
    }

    /// The configured sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Calculate RMS energy of a sample buffer
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
