//! Audio clip references
//!
//! An [`AudioClip`] is a handle to a WAV file on disk plus the header
//! metadata the next stage needs. Clips are created by capture or synthesis
//! and never mutated in place.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Reference to an audio file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// Path to the WAV file
    pub path: PathBuf,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count
    pub channels: u16,

    /// Clip length
    pub duration: Duration,
}

impl AudioClip {
    /// Open an existing WAV file and read its header metadata
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the path does not exist and
    /// `Error::Playback` if the file is not a readable WAV
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "audio file {} not found",
                path.display()
            )));
        }

        let reader = hound::WavReader::open(&path)
            .map_err(|e| Error::Playback(format!("{}: {e}", path.display())))?;
        let spec = reader.spec();
        // hound accepts a fmt chunk declaring rate 0; reject it before the
        // duration division
        if spec.sample_rate == 0 {
            return Err(Error::Playback(format!(
                "{}: declared sample rate is 0",
                path.display()
            )));
        }
        let frames = u64::from(reader.duration());
        let duration = Duration::from_secs_f64(f64::from(reader.duration()) / f64::from(spec.sample_rate));

        tracing::debug!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            frames,
            "opened audio clip"
        );

        Ok(Self {
            path,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            duration,
        })
    }

    /// Read the clip's WAV bytes
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }

    /// Decode the clip to mono f32 samples in `[-1.0, 1.0]`
    ///
    /// Multi-channel files are downmixed by averaging.
    ///
    /// # Errors
    ///
    /// Returns `Error::Playback` if the file is malformed
    pub fn read_samples(&self) -> Result<Vec<f32>> {
        let mut reader = hound::WavReader::open(&self.path)
            .map_err(|e| Error::Playback(format!("{}: {e}", self.path.display())))?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let scale = f32::from(i16::MAX);
                reader
                    .samples::<i16>()
                    .map(|s| s.map(|v| f32::from(v) / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::Playback(format!("{}: {e}", self.path.display())))?
            }
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Playback(format!("{}: {e}", self.path.display())))?,
        };

        if channels == 1 {
            return Ok(interleaved);
        }

        #[allow(clippy::cast_precision_loss)]
        let mono = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        Ok(mono)
    }
}

/// Encode f32 samples as 16-bit mono WAV bytes
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

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Device(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Device(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Device(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Write f32 samples to a 16-bit mono WAV file and return the clip
///
/// # Errors
///
/// Returns error if encoding or the file write fails
pub(crate) fn write_wav(samples: &[f32], sample_rate: u32, path: &Path) -> Result<AudioClip> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = samples_to_wav(samples, sample_rate)?;
    std::fs::write(path, bytes)?;
    AudioClip::open(path)
}
