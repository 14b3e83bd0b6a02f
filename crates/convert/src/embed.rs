//! Inline image embedding for the conversion engine.
//!
//! Image bytes are staged through a scoped temp file; dropping the handle
//! removes it on every exit path, success or failure. Fetch failures are
//! non-fatal and degrade to a placeholder text run.

use std::io::Write;
use std::path::PathBuf;

use reqwest::Client;
use tracing::{debug, warn};

use crate::document::Run;

/// Pixel size assumed when an image declares no usable width/height.
const DEFAULT_DIMENSION_PX: u32 = 200;

/// Device pixels per inch of print space.
const PX_PER_INCH: f64 = 96.0;

/// Placeholder run for an HTTP failure (non-200 response).
const ERROR_PLACEHOLDER: &str = "[Error loading image]";

/// Placeholder run for a transport or I/O failure.
const EXCEPTION_PLACEHOLDER: &str = "[Exception loading image]";

/// Downloads remote images and produces embedded image runs.
pub struct ImageEmbedder {
    client: Client,
    temp_dir: PathBuf,
}

impl ImageEmbedder {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Stage temp files under a specific directory (used by tests to observe
    /// that no temp resource outlives an embed call).
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Fetch `src` and produce an [`Run::Image`], or a placeholder text run
    /// when retrieval fails.
    pub async fn embed(
        &self,
        src: &str,
        width_attr: Option<&str>,
        height_attr: Option<&str>,
    ) -> Run {
        match self.fetch_to_temp(src).await {
            Ok(data) => {
                let width_px = parse_dimension(width_attr);
                let height_px = parse_dimension(height_attr);
                debug!(src, width_px, height_px, bytes = data.len(), "image embedded");
                Run::Image {
                    data,
                    width_in: f64::from(width_px) / PX_PER_INCH,
                    height_in: f64::from(height_px) / PX_PER_INCH,
                }
            }
            Err(placeholder) => Run::text(placeholder),
        }
    }

    /// Stream the image into a scoped temp file, then read it back.
    /// Returns the placeholder text on any failure.
    async fn fetch_to_temp(&self, src: &str) -> Result<Vec<u8>, &'static str> {
        let mut response = self.client.get(src).send().await.map_err(|e| {
            warn!(src, error = %e, "image request failed");
            EXCEPTION_PLACEHOLDER
        })?;

        if !response.status().is_success() {
            warn!(src, status = %response.status(), "image fetch returned non-success");
            return Err(ERROR_PLACEHOLDER);
        }

        let mut staged = tempfile::Builder::new()
            .prefix("lessonforge-img-")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| {
                warn!(src, error = %e, "temp file creation failed");
                EXCEPTION_PLACEHOLDER
            })?;

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    staged.write_all(&chunk).map_err(|e| {
                        warn!(src, error = %e, "temp file write failed");
                        EXCEPTION_PLACEHOLDER
                    })?;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(src, error = %e, "image body read failed");
                    return Err(EXCEPTION_PLACEHOLDER);
                }
            }
        }

        std::fs::read(staged.path()).map_err(|e| {
            warn!(src, error = %e, "temp file read failed");
            EXCEPTION_PLACEHOLDER
        })
    }
}

/// Parse a declared pixel dimension, defaulting when absent or unparsable.
fn parse_dimension(attr: Option<&str>) -> u32 {
    attr.and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_DIMENSION_PX)
}
