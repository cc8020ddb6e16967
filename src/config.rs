//! Renderer configuration
//!
//! All fields default to sensible values, so an empty TOML document is
//! a valid configuration.

use crate::error::{CardsmithError, CardsmithResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Root renderer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Default card dimensions
    pub card: CardConfig,

    /// Batch execution settings
    pub batch: BatchConfig,

    /// Cache settings
    pub cache: CacheConfig,

    /// Render engine settings
    pub engine: EngineConfig,
}

/// Default card dimensions, used when a request supplies none
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Card width in pixels
    pub width: u32,
    /// Card height in pixels
    pub height: u32,
}

impl Default for CardConfig {
    fn default() -> Self {
        // The common Open Graph card size
        Self {
            width: 1200,
            height: 630,
        }
    }
}

/// Batch execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum renders in flight at once
    pub concurrency: usize,
    /// Whether the persistent cache is consulted and written
    pub cache: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            cache: true,
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root, relative to the project root
    pub dir: PathBuf,
    /// Namespace directory under the cache root
    pub namespace: String,
    /// File extension for cache entries
    pub ext: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".cache"),
            namespace: "cards".to_string(),
            ext: "png".to_string(),
        }
    }
}

/// Render engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit browser binary, if auto-discovery should be skipped
    pub executable: Option<PathBuf>,
}

impl RendererConfig {
    /// Load a configuration file, falling back to defaults if it is absent
    pub async fn load(path: &Path) -> CardsmithResult<Self> {
        if !path.exists() {
            debug!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CardsmithError::io(format!("reading config from {}", path.display()), e))?;

        let config: Self = toml::from_str(&content).map_err(|e| CardsmithError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a TOML document
    pub fn from_toml_str(content: &str) -> CardsmithResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the orchestrator cannot honor
    pub fn validate(&self) -> CardsmithResult<()> {
        if self.batch.concurrency == 0 {
            return Err(CardsmithError::OptionInvalid(
                "batch.concurrency must be at least 1".to_string(),
            ));
        }
        if self.card.width == 0 || self.card.height == 0 {
            return Err(CardsmithError::OptionInvalid(
                "card dimensions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
