//! Batch input and output types
//!
//! A `RenderRequest` is one unit of work: the props a template consumes,
//! where the finished image goes, and the pixel dimensions to render at.
//! The orchestrator answers with one `RenderOutcome` per request, in the
//! same order the requests came in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// One page's card to render
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Arbitrary page metadata passed to the template
    pub props: Map<String, Value>,
    /// Where the rendered image is written
    pub output_path: PathBuf,
    /// Card width in pixels
    pub width: u32,
    /// Card height in pixels
    pub height: u32,
}

impl RenderRequest {
    /// Create a request with the given props and output path
    pub fn new(props: Map<String, Value>, output_path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            props,
            output_path: output_path.into(),
            width,
            height,
        }
    }
}

/// The result of rendering one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOutcome {
    /// The output path the request asked for
    pub output_path: PathBuf,
    /// Whether the image came from the cache
    pub cached: bool,
    /// Why this request failed, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenderOutcome {
    /// A successful outcome
    pub fn ok(output_path: PathBuf, cached: bool) -> Self {
        Self {
            output_path,
            cached,
            error: None,
        }
    }

    /// A failed outcome
    pub fn failed(output_path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            output_path,
            cached: false,
            error: Some(error.into()),
        }
    }

    /// Whether the request produced an image
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}
