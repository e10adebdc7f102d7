//! Configuration for the visage pipeline
//!
//! All ambient state (API keys, paths, model identifiers) is collected here
//! and passed into each component at construction. Nothing else in the crate
//! reads the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Default microphone capture length in seconds
const DEFAULT_CAPTURE_SECS: u64 = 5;

/// Greeting spoken at the start of every conversational turn
const DEFAULT_GREETING: &str = "Hi, I am your virtual assistant. How can I support you?";

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API key, from `OPENAI_API_KEY`
    ///
    /// Required by the transcriber, response generator, and synthesizer;
    /// each validates it at construction.
    pub openai_api_key: Option<String>,

    /// Speech recognition settings
    pub asr: AsrConfig,

    /// Response generation settings
    pub nlp: NlpConfig,

    /// Speech synthesis settings
    pub tts: TtsConfig,

    /// Lip-sync renderer settings
    pub lipsync: LipSyncConfig,

    /// Blendshape sink endpoint URL
    pub sink_url: String,

    /// Greeting spoken at the start of a turn
    pub greeting: String,
}

/// Speech recognition settings
#[derive(Debug, Clone)]
pub struct AsrConfig {
    /// Transcription model identifier (e.g. "whisper-1")
    pub model: String,

    /// Microphone capture duration
    pub capture_duration: Duration,

    /// Path the captured WAV file is written to
    pub capture_file: PathBuf,
}

/// Response generation settings
#[derive(Debug, Clone)]
pub struct NlpConfig {
    /// Completion model identifier
    pub model: String,

    /// Maximum tokens per completion
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

/// Speech synthesis settings
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Speech model identifier (e.g. "tts-1")
    pub model: String,

    /// Voice selector
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0)
    pub speed: f32,

    /// Directory synthesized audio files are written to
    pub output_dir: PathBuf,
}

/// Lip-sync renderer settings
#[derive(Debug, Clone)]
pub struct LipSyncConfig {
    /// Renderer installation directory, from `VISAGE_RENDERER_DIR`
    ///
    /// Required for the lip-sync chain; validated at renderer construction,
    /// never prompted for interactively.
    pub renderer_dir: Option<PathBuf>,

    /// Interpreter the renderer script is run with
    pub renderer_bin: String,

    /// Renderer entry script, relative to `renderer_dir`
    pub renderer_script: String,

    /// Model checkpoint path, relative to `renderer_dir`
    pub checkpoint: String,

    /// Reference face image, from `VISAGE_FACE_IMAGE`
    pub face_image: Option<PathBuf>,

    /// Directory the rendered video is written to
    pub video_dir: PathBuf,

    /// Directory the blendshape JSON file is written to
    pub blendshape_dir: PathBuf,

    /// Blendshape extraction service URL; when unset the chain stops at the
    /// rendered video
    pub extractor_url: Option<String>,
}

impl Config {
    /// Build configuration from the environment, layered over [`Config::default`]
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            ..Self::default()
        };

        env_override("VISAGE_ASR_MODEL", &mut config.asr.model);
        if let Some(secs) = env_parse("VISAGE_CAPTURE_SECS") {
            config.asr.capture_duration = Duration::from_secs(secs);
        }
        env_override_path("VISAGE_CAPTURE_FILE", &mut config.asr.capture_file);

        env_override("VISAGE_NLP_MODEL", &mut config.nlp.model);
        if let Some(max_tokens) = env_parse("VISAGE_NLP_MAX_TOKENS") {
            config.nlp.max_tokens = max_tokens;
        }
        if let Some(temperature) = env_parse("VISAGE_NLP_TEMPERATURE") {
            config.nlp.temperature = temperature;
        }

        env_override("VISAGE_TTS_MODEL", &mut config.tts.model);
        env_override("VISAGE_TTS_VOICE", &mut config.tts.voice);
        if let Some(speed) = env_parse("VISAGE_TTS_SPEED") {
            config.tts.speed = speed;
        }
        env_override_path("VISAGE_TTS_DIR", &mut config.tts.output_dir);

        config.lipsync.renderer_dir = std::env::var("VISAGE_RENDERER_DIR").ok().map(PathBuf::from);
        env_override("VISAGE_RENDERER_BIN", &mut config.lipsync.renderer_bin);
        env_override("VISAGE_RENDERER_SCRIPT", &mut config.lipsync.renderer_script);
        env_override("VISAGE_CHECKPOINT", &mut config.lipsync.checkpoint);
        config.lipsync.face_image = std::env::var("VISAGE_FACE_IMAGE").ok().map(PathBuf::from);
        env_override_path("VISAGE_VIDEO_DIR", &mut config.lipsync.video_dir);
        env_override_path("VISAGE_BLENDSHAPE_DIR", &mut config.lipsync.blendshape_dir);
        config.lipsync.extractor_url = std::env::var("VISAGE_EXTRACTOR_URL").ok();

        env_override("VISAGE_SINK_URL", &mut config.sink_url);
        env_override("VISAGE_GREETING", &mut config.greeting);

        config
    }

    /// API key for the hosted speech and language models
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `OPENAI_API_KEY` is not set
    pub fn require_api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))
    }

    /// Validate the settings the conversational chain needs
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the missing variable
    pub fn validate_voice(&self) -> Result<()> {
        self.require_api_key()?;
        Ok(())
    }

    /// Validate the settings the lip-sync chain needs
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the missing variable
    pub fn validate_lipsync(&self) -> Result<()> {
        if self.lipsync.renderer_dir.is_none() {
            return Err(Error::Config("VISAGE_RENDERER_DIR is not set".to_string()));
        }
        if self.lipsync.face_image.is_none() {
            return Err(Error::Config("VISAGE_FACE_IMAGE is not set".to_string()));
        }
        Ok(())
    }

    /// Whether enough lip-sync settings are present to run the chain
    #[must_use]
    pub const fn lipsync_configured(&self) -> bool {
        self.lipsync.renderer_dir.is_some() && self.lipsync.face_image.is_some()
    }
}

impl Default for Config {
    /// Documented defaults, with no environment access
    fn default() -> Self {
        Self {
            openai_api_key: None,
            asr: AsrConfig {
                model: "whisper-1".to_string(),
                capture_duration: Duration::from_secs(DEFAULT_CAPTURE_SECS),
                capture_file: PathBuf::from("captured_audio.wav"),
            },
            nlp: NlpConfig {
                model: "gpt-3.5-turbo-instruct".to_string(),
                max_tokens: 150,
                temperature: 0.7,
            },
            tts: TtsConfig {
                model: "tts-1".to_string(),
                voice: "alloy".to_string(),
                speed: 1.0,
                output_dir: PathBuf::from("tts_output"),
            },
            lipsync: LipSyncConfig {
                renderer_dir: None,
                renderer_bin: "python".to_string(),
                renderer_script: "inference.py".to_string(),
                checkpoint: "checkpoints/wav2lip_gan.pth".to_string(),
                face_image: None,
                video_dir: PathBuf::from("output/video"),
                blendshape_dir: PathBuf::from("output/blendshapes"),
                extractor_url: None,
            },
            sink_url: "http://localhost:8080/apply_blendshapes".to_string(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

fn env_override(key: &str, slot: &mut String) {
    if let Ok(value) = std::env::var(key) {
        *slot = value;
    }
}

fn env_override_path(key: &str, slot: &mut PathBuf) {
    if let Ok(value) = std::env::var(key) {
        *slot = PathBuf::from(value);
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
