//! Template abstraction
//!
//! A template is any async `props -> HTML` capability; the orchestrator
//! never knows whether it came from a hand-written function, a compiled
//! component, or the built-in default card. Resolution failure is fatal
//! to a batch call, render failure is isolated to one request.

pub mod default_card;

pub use default_card::DefaultCardTemplate;

use crate::cache::TemplateIdentity;
use crate::error::CardsmithResult;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A resolved template: turns one request's props into an HTML fragment
#[async_trait]
pub trait Template: Send + Sync {
    /// Render the card HTML for one props map
    async fn render(&self, props: &Map<String, Value>) -> CardsmithResult<String>;

    /// The identity fed into cache key derivation
    ///
    /// Stable for the lifetime of the resolved template.
    fn identity(&self) -> TemplateIdentity;
}

/// Produces the template a batch renders with
///
/// Implementations may compile external sources, read files, or just
/// hand back the built-in card. A resolution failure aborts the whole
/// batch call; no request can be rendered without a template.
#[async_trait]
pub trait TemplateResolver: Send + Sync {
    async fn resolve(&self) -> CardsmithResult<Arc<dyn Template>>;
}

/// Resolver that always yields the built-in default card
#[derive(Debug, Clone, Default)]
pub struct BuiltinResolver;

#[async_trait]
impl TemplateResolver for BuiltinResolver {
    async fn resolve(&self) -> CardsmithResult<Arc<dyn Template>> {
        Ok(Arc::new(DefaultCardTemplate))
    }
}
