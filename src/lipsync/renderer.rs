//! Lip-sync rendering via an external renderer subprocess
//!
//! Linear chain, no retries: invoke the renderer, then hand the video to the
//! configured blendshape extractor. Any step's failure short-circuits the
//! rest and yields no partial blendshape output.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use super::blendshapes::BlendshapeExtractor;
use crate::audio::AudioClip;
use crate::config::LipSyncConfig;
use crate::{Error, Result};

/// File name of the rendered video under the video directory
const VIDEO_FILE: &str = "lip_synced_video.mp4";

/// File name of the serialized blendshape set
const BLENDSHAPE_FILE: &str = "blendshapes.json";

/// Arguments for one renderer invocation
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Model checkpoint, relative to the renderer directory
    pub checkpoint: String,

    /// Reference face image
    pub face_image: PathBuf,

    /// Input audio file
    pub audio: PathBuf,

    /// Output video path
    pub outfile: PathBuf,
}

/// Result of a completed lip-sync chain
///
/// `blendshapes` is `None` when no extractor is configured, which lets the
/// caller tell "video produced, no blendshape file" apart from failure.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// Path of the rendered video
    pub video: PathBuf,

    /// Path of the serialized blendshape file, when extraction ran
    pub blendshapes: Option<PathBuf>,
}

/// Drives the external lip-sync renderer
pub struct LipSyncRenderer {
    renderer_dir: PathBuf,
    renderer_bin: String,
    renderer_script: String,
    checkpoint: String,
    face_image: PathBuf,
    video_dir: PathBuf,
    blendshape_dir: PathBuf,
    extractor: Option<Box<dyn BlendshapeExtractor>>,
}

impl std::fmt::Debug for LipSyncRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LipSyncRenderer")
            .field("renderer_dir", &self.renderer_dir)
            .field("renderer_bin", &self.renderer_bin)
            .field("renderer_script", &self.renderer_script)
            .field("checkpoint", &self.checkpoint)
            .field("face_image", &self.face_image)
            .field("video_dir", &self.video_dir)
            .field("blendshape_dir", &self.blendshape_dir)
            .field("extractor", &self.extractor.as_ref().map(|_| "BlendshapeExtractor"))
            .finish()
    }
}

impl LipSyncRenderer {
    /// Create a renderer from validated configuration
    ///
    /// The renderer directory and face image are required settings; their
    /// absence is a startup error, never an interactive prompt.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a required setting is missing and
    /// `Error::NotFound` if the renderer directory does not exist
    pub fn new(
        config: &LipSyncConfig,
        extractor: Option<Box<dyn BlendshapeExtractor>>,
    ) -> Result<Self> {
        let renderer_dir = config
            .renderer_dir
            .clone()
            .ok_or_else(|| Error::Config("VISAGE_RENDERER_DIR is not set".to_string()))?;
        let face_image = config
            .face_image
            .clone()
            .ok_or_else(|| Error::Config("VISAGE_FACE_IMAGE is not set".to_string()))?;

        if !renderer_dir.is_dir() {
            return Err(Error::NotFound(format!(
                "renderer directory {} not found",
                renderer_dir.display()
            )));
        }

        Ok(Self {
            renderer_dir,
            renderer_bin: config.renderer_bin.clone(),
            renderer_script: config.renderer_script.clone(),
            checkpoint: config.checkpoint.clone(),
            face_image,
            video_dir: config.video_dir.clone(),
            blendshape_dir: config.blendshape_dir.clone(),
            extractor,
        })
    }

    /// Render a lip-synced video for `audio` and extract blendshapes
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the audio file is missing,
    /// `Error::Render` if the subprocess fails, and `Error::Blendshape` if
    /// extraction fails
    pub async fn render(&self, audio: &AudioClip) -> Result<RenderOutcome> {
        if !audio.path.exists() {
            return Err(Error::NotFound(format!(
                "audio file {} not found",
                audio.path.display()
            )));
        }

        tokio::fs::create_dir_all(&self.video_dir).await?;
        let request = RenderRequest {
            checkpoint: self.checkpoint.clone(),
            face_image: self.face_image.clone(),
            audio: audio.path.clone(),
            outfile: self.video_dir.join(VIDEO_FILE),
        };

        let video = self.invoke(&request).await?;

        let Some(extractor) = self.extractor.as_deref() else {
            tracing::info!(video = %video.display(), "no extractor configured, skipping blendshapes");
            return Ok(RenderOutcome {
                video,
                blendshapes: None,
            });
        };

        let set = extractor.extract(&video).await?;
        let blendshape_path = self.blendshape_dir.join(BLENDSHAPE_FILE);
        set.write_file(&blendshape_path)?;

        Ok(RenderOutcome {
            video,
            blendshapes: Some(blendshape_path),
        })
    }

    /// Run the renderer subprocess and return the video path
    async fn invoke(&self, request: &RenderRequest) -> Result<PathBuf> {
        tracing::info!(
            renderer = %self.renderer_dir.display(),
            audio = %request.audio.display(),
            "running lip-sync renderer"
        );

        // Paths the renderer resolves itself stay relative to its directory;
        // ours must be absolute to survive the cwd change.
        let output = Command::new(&self.renderer_bin)
            .arg(&self.renderer_script)
            .arg("--checkpoint_path")
            .arg(&request.checkpoint)
            .arg("--face")
            .arg(absolute(&request.face_image)?)
            .arg("--audio")
            .arg(absolute(&request.audio)?)
            .arg("--outfile")
            .arg(absolute(&request.outfile)?)
            .current_dir(&self.renderer_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::Render(format!("failed to spawn renderer: {e}")))?;

        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(stderr = %stderr, "renderer stderr");
        }

        if !output.status.success() {
            let code = output.status.code().map_or_else(
                || "terminated by signal".to_string(),
                |c| format!("exit code {c}"),
            );
            tracing::error!(status = %code, "renderer failed");
            return Err(Error::Render(format!("renderer failed with {code}")));
        }

        tracing::info!(video = %request.outfile.display(), "lip-sync render complete");
        Ok(request.outfile.clone())
    }
}

/// Absolutize a path against the current working directory
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
