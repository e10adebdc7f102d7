//! Speech synthesis
//!
//! Wraps the hosted speech API and writes the result as a WAV file under the
//! configured output directory. Failures are typed (`Error::Synthesis`);
//! callers treat them as "synthesis unavailable" and skip playback rather
//! than crash.

use std::path::PathBuf;

use crate::audio::AudioClip;
use crate::config::TtsConfig;
use crate::{Error, Result};

/// Request body for the speech API
#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

/// Synthesizes speech from text
pub struct Synthesizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    voice: String,
    speed: f32,
    output_dir: PathBuf,
}

impl Synthesizer {
    /// Create a synthesizer
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the API key is empty
    pub fn new(api_key: String, config: &TtsConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone(),
            voice: config.voice.clone(),
            speed: config.speed,
            output_dir: config.output_dir.clone(),
        })
    }

    /// Path a given output file name resolves to
    ///
    /// Naming is idempotent: the same name always maps to the same path;
    /// synthesizing again overwrites the content.
    #[must_use]
    pub fn output_path(&self, output_file: &str) -> PathBuf {
        self.output_dir.join(output_file)
    }

    /// Synthesize `text` with the configured voice and write
    /// `<output_dir>/<output_file>` as WAV
    ///
    /// The output directory is created if missing.
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` if the model call fails
    pub async fn synthesize(&self, text: &str, output_file: &str) -> Result<AudioClip> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_path = self.output_path(output_file);

        tracing::info!(text = %text, voice = %self.voice, "synthesizing speech");

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
            // WAV keeps playback on the local decode path
            response_format: "wav",
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "speech request failed");
                Error::Synthesis(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "speech API error");
            return Err(Error::Synthesis(format!(
                "speech API error {status}: {body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;
        tokio::fs::write(&output_path, &audio).await?;

        let clip = AudioClip::open(&output_path)
            .map_err(|e| Error::Synthesis(format!("speech API returned unreadable audio: {e}")))?;
        tracing::info!(path = %clip.path.display(), "audio saved");
        Ok(clip)
    }
}
