//! Facial blendshape parameters
//!
//! A [`BlendshapeSet`] maps recognized ARKit face-parameter names to
//! intensities in `[0, 1]`. Unrecognized keys and out-of-range values are a
//! contract violation rejected at construction, never silently accepted.
//! Extraction from a rendered video is an external collaborator behind the
//! [`BlendshapeExtractor`] trait.

use std::collections::BTreeMap;
use std::path::Path;

use crate::{Error, Result};

/// The recognized facial parameter vocabulary (the 52 ARKit blendshapes)
pub const BLENDSHAPE_NAMES: [&str; 52] = [
    "browDownLeft",
    "browDownRight",
    "browInnerUp",
    "browOuterUpLeft",
    "browOuterUpRight",
    "cheekPuff",
    "cheekSquintLeft",
    "cheekSquintRight",
    "eyeBlinkLeft",
    "eyeBlinkRight",
    "eyeLookDownLeft",
    "eyeLookDownRight",
    "eyeLookInLeft",
    "eyeLookInRight",
    "eyeLookOutLeft",
    "eyeLookOutRight",
    "eyeLookUpLeft",
    "eyeLookUpRight",
    "eyeSquintLeft",
    "eyeSquintRight",
    "eyeWideLeft",
    "eyeWideRight",
    "jawForward",
    "jawLeft",
    "jawOpen",
    "jawRight",
    "mouthClose",
    "mouthDimpleLeft",
    "mouthDimpleRight",
    "mouthFrownLeft",
    "mouthFrownRight",
    "mouthFunnel",
    "mouthLeft",
    "mouthLowerDownLeft",
    "mouthLowerDownRight",
    "mouthPressLeft",
    "mouthPressRight",
    "mouthPucker",
    "mouthRight",
    "mouthRollLower",
    "mouthRollUpper",
    "mouthShrugLower",
    "mouthShrugUpper",
    "mouthSmileLeft",
    "mouthSmileRight",
    "mouthStretchLeft",
    "mouthStretchRight",
    "mouthUpperUpLeft",
    "mouthUpperUpRight",
    "noseSneerLeft",
    "noseSneerRight",
    "tongueOut",
];

/// Whether `name` belongs to the recognized parameter vocabulary
#[must_use]
pub fn is_recognized(name: &str) -> bool {
    BLENDSHAPE_NAMES.contains(&name)
}

/// A validated set of facial parameters
///
/// Serializes to a flat JSON object mapping parameter name to intensity; no
/// nesting, no version field.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct BlendshapeSet(BTreeMap<String, f32>);

impl BlendshapeSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a raw name → intensity map, validating every entry
    ///
    /// # Errors
    ///
    /// Returns `Error::Blendshape` on an unrecognized name or an intensity
    /// outside `[0, 1]`
    pub fn from_map(map: BTreeMap<String, f32>) -> Result<Self> {
        let mut set = Self::new();
        for (name, value) in map {
            set.insert(&name, value)?;
        }
        Ok(set)
    }

    /// Set one parameter
    ///
    /// # Errors
    ///
    /// Returns `Error::Blendshape` if `name` is not in the vocabulary or
    /// `value` is outside `[0, 1]`
    pub fn insert(&mut self, name: &str, value: f32) -> Result<()> {
        if !is_recognized(name) {
            return Err(Error::Blendshape(format!(
                "unrecognized blendshape parameter: {name}"
            )));
        }
        if !(0.0..=1.0).contains(&value) || !value.is_finite() {
            return Err(Error::Blendshape(format!(
                "intensity for {name} out of range: {value}"
            )));
        }
        self.0.insert(name.to_string(), value);
        Ok(())
    }

    /// Look up one parameter
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f32> {
        self.0.get(name).copied()
    }

    /// Number of parameters present
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no parameters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over name/intensity pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Parse and validate a flat JSON object
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON and
    /// `Error::Blendshape` for contract violations
    pub fn from_json(json: &str) -> Result<Self> {
        let map: BTreeMap<String, f32> = serde_json::from_str(json)?;
        Self::from_map(map)
    }

    /// Read and validate a blendshape JSON file
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the file does not exist, a
    /// serialization error for malformed JSON, and `Error::Blendshape` for
    /// contract violations
    pub fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "blendshape file {} not found",
                path.display()
            )));
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Serialize the set to a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the file write fails
    pub fn write_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(&self)?)?;
        tracing::debug!(path = %path.display(), parameters = self.len(), "wrote blendshapes");
        Ok(())
    }
}

/// Derives facial parameters from a rendered video
///
/// An external model collaborator with a narrow request/response contract:
/// video in, validated parameter set out.
#[async_trait::async_trait]
pub trait BlendshapeExtractor: Send + Sync {
    /// Extract a blendshape set from the video at `video`
    ///
    /// # Errors
    ///
    /// Returns `Error::Blendshape` if extraction fails or the result
    /// violates the parameter contract
    async fn extract(&self, video: &Path) -> Result<BlendshapeSet>;
}

/// Extractor backed by an HTTP analysis service
///
/// POSTs the video as multipart and expects a flat name → intensity JSON
/// object back.
pub struct HttpExtractor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpExtractor {
    /// Create an extractor for the given analysis endpoint
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait::async_trait]
impl BlendshapeExtractor for HttpExtractor {
    async fn extract(&self, video: &Path) -> Result<BlendshapeSet> {
        let bytes = tokio::fs::read(video).await?;
        tracing::debug!(
            video = %video.display(),
            video_bytes = bytes.len(),
            "requesting blendshape extraction"
        );

        let form = reqwest::multipart::Form::new().part(
            "video",
            reqwest::multipart::Part::bytes(bytes)
                .file_name("render.mp4")
                .mime_str("video/mp4")
                .map_err(|e| Error::Blendshape(e.to_string()))?,
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Blendshape(format!("extraction request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Blendshape(format!(
                "extraction service error {status}: {body}"
            )));
        }

        let map: BTreeMap<String, f32> = response
            .json()
            .await
            .map_err(|e| Error::Blendshape(format!("malformed extraction response: {e}")))?;
        let set = BlendshapeSet::from_map(map)?;
        tracing::info!(parameters = set.len(), "blendshapes extracted");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_recognized_parameters() {
        let mut set = BlendshapeSet::new();
        set.insert("jawOpen", 0.8).unwrap();
        set.insert("mouthSmileLeft", 0.5).unwrap();
        set.insert("mouthSmileRight", 0.5).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("jawOpen"), Some(0.8));
    }

    #[test]
    fn rejects_unknown_parameter() {
        let mut set = BlendshapeSet::new();
        let err = set.insert("jaw_open", 0.5).unwrap_err();
        assert!(matches!(err, Error::Blendshape(_)));
    }

    #[test]
    fn rejects_out_of_range_intensity() {
        let mut set = BlendshapeSet::new();
        assert!(set.insert("jawOpen", 1.5).is_err());
        assert!(set.insert("jawOpen", -0.1).is_err());
        assert!(set.insert("jawOpen", f32::NAN).is_err());
        assert!(set.insert("jawOpen", 0.0).is_ok());
        assert!(set.insert("jawOpen", 1.0).is_ok());
    }

    #[test]
    fn json_is_flat() {
        let mut set = BlendshapeSet::new();
        set.insert("jawOpen", 0.25).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"jawOpen":0.25}"#);
    }

    #[test]
    fn from_json_validates() {
        assert!(BlendshapeSet::from_json(r#"{"jawOpen":0.5}"#).is_ok());
        assert!(BlendshapeSet::from_json(r#"{"notAShape":0.5}"#).is_err());
        assert!(BlendshapeSet::from_json(r#"{"jawOpen":2.0}"#).is_err());
        assert!(BlendshapeSet::from_json("not json").is_err());
    }
}
