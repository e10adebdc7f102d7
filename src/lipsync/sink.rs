//! Blendshape delivery to a render engine
//!
//! One `POST` of the flat blendshape JSON per call, at most one delivery
//! attempt. The render engine is a best-effort convenience: delivery
//! failures are logged and swallowed so the pipeline never crashes on an
//! unreachable engine.

use std::path::Path;

use super::blendshapes::BlendshapeSet;
use crate::Result;

/// Forwards blendshape sets to a remote render engine over HTTP
pub struct BlendshapeSink {
    client: reqwest::Client,
    endpoint: String,
}

impl BlendshapeSink {
    /// Create a sink for the given engine endpoint
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// The configured endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Read a blendshape file and POST it to the engine
    ///
    /// A missing or corrupt file is a real error (the artifact is produced
    /// upstream in the same run); an unreachable engine or a non-2xx
    /// response is logged and reported as success.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for a missing file and parse errors for a
    /// corrupt one; never fails on delivery
    pub async fn send_file(&self, path: &Path) -> Result<()> {
        let set = BlendshapeSet::read_file(path)?;
        self.send(&set).await;
        Ok(())
    }

    /// POST a blendshape set to the engine, swallowing delivery failures
    pub async fn send(&self, set: &BlendshapeSet) {
        let response = match self
            .client
            .post(&self.endpoint)
            .json(set)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "blendshape delivery failed");
                return;
            }
        };

        let status = response.status();
        if status.is_success() {
            tracing::info!(endpoint = %self.endpoint, "blendshapes sent to render engine");
        } else {
            tracing::warn!(
                endpoint = %self.endpoint,
                status = %status,
                "render engine rejected blendshapes"
            );
        }
    }
}
