//! Conversation orchestration
//!
//! One fixed pass per invocation: speak a greeting → play it → capture →
//! transcribe → generate → synthesize → play. No looping, no barge-in, no
//! retries; a human operator re-runs on failure.

use crate::asr::{Transcriber, Transcript};
use crate::audio::{AudioCapture, AudioClip, AudioPlayback, CAPTURE_SAMPLE_RATE};
use crate::config::Config;
use crate::nlp::{Reply, ResponseGenerator};
use crate::tts::Synthesizer;
use crate::Result;

/// Output file name for the synthesized greeting
const GREETING_FILE: &str = "welcome.wav";

/// Output file name for the synthesized reply
const REPLY_FILE: &str = "response.wav";

/// What one conversational turn produced
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// What the user said
    pub transcript: Transcript,

    /// The generated reply
    pub reply: Reply,

    /// The synthesized reply audio, when synthesis succeeded
    pub reply_audio: Option<AudioClip>,
}

/// Sequences the conversational stages
///
/// The only component with cross-cutting control flow; every stage call
/// blocks until its external collaborator returns.
pub struct ConversationOrchestrator {
    config: Config,
    transcriber: Transcriber,
    generator: ResponseGenerator,
    synthesizer: Synthesizer,
}

impl ConversationOrchestrator {
    /// Build the orchestrator from configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the API key is missing
    pub fn new(config: Config) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let transcriber = Transcriber::new(api_key.clone(), &config.asr)?;
        let generator = ResponseGenerator::new(api_key.clone(), &config.nlp)?;
        let synthesizer = Synthesizer::new(api_key, &config.tts)?;

        Ok(Self {
            config,
            transcriber,
            generator,
            synthesizer,
        })
    }

    /// Run one complete conversational turn
    ///
    /// Greeting synthesis and all playback are best-effort: failures are
    /// logged and the turn continues. Capture and transcription failures
    /// halt the turn.
    ///
    /// # Errors
    ///
    /// Returns error if capture or transcription fails; their output is
    /// required for the rest of the turn
    pub async fn run_turn(&self) -> Result<TurnReport> {
        self.greet().await;

        let capture = AudioCapture::new(CAPTURE_SAMPLE_RATE)?;
        tracing::info!("listening for your question");
        let clip = capture.record(
            self.config.asr.capture_duration,
            &self.config.asr.capture_file,
        )?;

        let transcript = self.transcriber.transcribe(&clip).await?;
        tracing::info!(text = %transcript.text, "user said");

        let reply = self.generator.generate(&transcript.text, "").await;
        tracing::info!(text = %reply.text, model_output = reply.is_model_output(), "reply");

        let reply_audio = match self.synthesizer.synthesize(&reply.text, REPLY_FILE).await {
            Ok(clip) => {
                self.play_best_effort(&clip);
                Some(clip)
            }
            Err(e) => {
                tracing::warn!(error = %e, "reply synthesis unavailable, skipping playback");
                None
            }
        };

        Ok(TurnReport {
            transcript,
            reply,
            reply_audio,
        })
    }

    /// Synthesize and play the greeting, best-effort
    async fn greet(&self) {
        tracing::info!(greeting = %self.config.greeting, "speaking greeting");
        match self
            .synthesizer
            .synthesize(&self.config.greeting, GREETING_FILE)
            .await
        {
            Ok(clip) => self.play_best_effort(&clip),
            Err(e) => tracing::warn!(error = %e, "greeting synthesis failed, skipping"),
        }
    }

    /// Play a clip, logging failure instead of propagating it
    fn play_best_effort(&self, clip: &AudioClip) {
        let result = AudioPlayback::new().and_then(|playback| playback.play(clip));
        if let Err(e) = result {
            tracing::warn!(path = %clip.path.display(), error = %e, "playback failed");
        }
    }
}
