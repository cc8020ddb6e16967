//! Render engine abstraction
//!
//! Provides traits for the headless rendering engine so the batch
//! orchestrator can be driven by the real Chromium backend or by
//! instrumented fakes in tests.

pub mod chromium;

pub use chromium::ChromiumEngine;

use crate::error::CardsmithResult;
use async_trait::async_trait;

/// Factory for render sessions
///
/// An engine that cannot be launched (missing binary, broken install)
/// is a normal `None` branch, not an error: the surrounding build is
/// expected to continue without card images.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Launch the engine process, or `None` if it is unavailable
    ///
    /// Unavailability is logged as a warning once per open attempt.
    async fn open(&self) -> Option<Box<dyn RenderSession>>;

    /// The human-readable engine name for display
    fn engine_name(&self) -> &'static str;
}

/// A live handle to one engine process, shared by a whole batch
///
/// Each render call creates and destroys its own page inside the
/// session, so concurrent renders never share per-page state.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Render standalone HTML at an exact viewport and return the image bytes
    async fn render_page(&self, html: &str, width: u32, height: u32) -> CardsmithResult<Vec<u8>>;

    /// Close the engine process
    ///
    /// Consumes the session, so it can only ever run once.
    async fn dispose(self: Box<Self>);
}
