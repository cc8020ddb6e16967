//! cardsmith - Batch social-card image rendering
//!
//! Renders preview images for a batch of content pages at build time,
//! sharing one headless Chromium process across the whole batch and
//! skipping already-rendered cards via a content-addressed cache.

pub mod batch;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod request;
pub mod template;

pub use batch::BatchRenderer;
pub use cache::{CacheKey, CacheStore, TemplateIdentity};
pub use config::{BatchConfig, RendererConfig};
pub use engine::{ChromiumEngine, RenderEngine, RenderSession};
pub use error::{CardsmithError, CardsmithResult};
pub use request::{RenderOutcome, RenderRequest};
pub use template::{BuiltinResolver, Template, TemplateResolver};
