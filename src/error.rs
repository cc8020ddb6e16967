//! Error types for cardsmith
//!
//! All modules use `CardsmithResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cardsmith operations
pub type CardsmithResult<T> = Result<T, CardsmithError>;

/// All errors that can occur in cardsmith
#[derive(Error, Debug)]
pub enum CardsmithError {
    // Template errors
    #[error("Failed to resolve template {reference}: {reason}")]
    TemplateResolution { reference: String, reason: String },

    #[error("Template render failed: {0}")]
    TemplateRender(String),

    // Engine errors
    #[error("Render engine failed to launch: {0}")]
    EngineLaunch(String),

    #[error("Render engine protocol error: {0}")]
    EngineProtocol(String),

    #[error("Screenshot capture failed: {0}")]
    Screenshot(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Invalid renderer option: {0}")]
    OptionInvalid(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CardsmithError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a template resolution error
    pub fn resolution(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TemplateResolution {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts a whole batch call rather than one request
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TemplateResolution { .. } | Self::ConfigInvalid { .. } | Self::OptionInvalid(_)
        )
    }
}
