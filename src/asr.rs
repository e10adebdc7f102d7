//! Speech recognition
//!
//! Wraps the hosted Whisper transcription API. The model itself is an
//! external collaborator; this stage marshals the audio file and returns the
//! best transcription as plain text. No retry: a model failure propagates.

use std::path::PathBuf;

use crate::config::AsrConfig;
use crate::audio::AudioClip;
use crate::{Error, Result};

/// Response from the transcription API
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Plain-text transcription with provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Transcribed text
    pub text: String,

    /// Clip the text was transcribed from
    pub source: PathBuf,
}

/// Transcribes speech to text
pub struct Transcriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl Transcriber {
    /// Create a transcriber
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the API key is empty
    pub fn new(api_key: String, config: &AsrConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for transcription".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// Transcribe an audio clip to text
    ///
    /// The clip path is checked before the model is invoked.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the clip file does not exist and
    /// `Error::Transcription` if the model call fails
    pub async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript> {
        if !clip.path.exists() {
            return Err(Error::NotFound(format!(
                "audio file {} not found",
                clip.path.display()
            )));
        }

        let audio = clip.read_bytes()?;
        tracing::debug!(
            path = %clip.path.display(),
            audio_bytes = audio.len(),
            "starting transcription"
        );

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Transcription(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                Error::Transcription(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Transcription(format!(
                "transcription API error {status}: {body}"
            )));
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("failed to parse response: {e}")))?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(Transcript {
            text: result.text,
            source: clip.path.clone(),
        })
    }
}
