//! Batch orchestrator
//!
//! Drives a whole batch of render requests against one shared engine
//! session: resolves the template once, serves cache hits without
//! touching the engine, opens the engine lazily only when a miss
//! exists, bounds how many renders are in flight, and isolates every
//! per-request failure into that request's outcome. The session is
//! disposed exactly once on every exit path after it was opened.

use crate::cache::{CacheKey, CacheStore, TemplateIdentity};
use crate::config::BatchConfig;
use crate::engine::{RenderEngine, RenderSession};
use crate::error::{CardsmithError, CardsmithResult};
use crate::request::{RenderOutcome, RenderRequest};
use crate::template::{Template, TemplateResolver};
use futures_util::future::join_all;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Outcome error message when the engine cannot be launched
const ENGINE_UNAVAILABLE: &str = "render engine unavailable";

/// Renders batches of card requests against a shared engine session
pub struct BatchRenderer {
    engine: Arc<dyn RenderEngine>,
    store: CacheStore,
    concurrency: usize,
    cache_enabled: bool,
}

impl BatchRenderer {
    /// Create a renderer over the given engine and cache store
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        store: CacheStore,
        options: &BatchConfig,
    ) -> CardsmithResult<Self> {
        if options.concurrency == 0 {
            return Err(CardsmithError::OptionInvalid(
                "batch.concurrency must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            engine,
            store,
            concurrency: options.concurrency,
            cache_enabled: options.cache,
        })
    }

    /// Render one batch, returning an outcome per request in input order
    ///
    /// Only template resolution failure propagates as an error; every
    /// other failure is folded into the affected request's outcome.
    pub async fn render(
        &self,
        resolver: &dyn TemplateResolver,
        requests: &[RenderRequest],
    ) -> CardsmithResult<Vec<RenderOutcome>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        // Resolution failure is fatal: nothing can render without a template
        let template = resolver.resolve().await?;
        let identity = template.identity();

        let keys = self.compute_keys(&identity, requests);

        if self.cache_enabled {
            if let Some(outcomes) = self.try_fast_path(requests, &keys).await {
                info!(
                    "Batch of {} cards served entirely from cache",
                    requests.len()
                );
                return Ok(outcomes);
            }
        }

        let Some(session) = self.engine.open().await else {
            warn!(
                "{} unavailable, skipping {} card renders",
                self.engine.engine_name(),
                requests.len()
            );
            return Ok(requests
                .iter()
                .map(|r| RenderOutcome::failed(r.output_path.clone(), ENGINE_UNAVAILABLE))
                .collect());
        };

        info!(
            "Rendering batch of {} cards (concurrency {})",
            requests.len(),
            self.concurrency
        );

        // After this point nothing may early-return: the session must
        // be disposed exactly once, however individual requests fare.
        let mut outcomes = Vec::with_capacity(requests.len());
        for (chunk, chunk_keys) in requests
            .chunks(self.concurrency)
            .zip(keys.chunks(self.concurrency))
        {
            let in_flight = chunk
                .iter()
                .zip(chunk_keys)
                .map(|(request, key)| {
                    self.process_one(template.as_ref(), session.as_ref(), request, key.as_ref())
                });
            outcomes.extend(join_all(in_flight).await);
        }

        session.dispose().await;

        let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
        let cached = outcomes.iter().filter(|o| o.cached).count();
        info!(
            "Batch complete: {} rendered, {} cached, {} failed",
            outcomes.len() - failed - cached,
            cached,
            failed
        );
        Ok(outcomes)
    }

    /// Cache keys per request; `None` entries when caching is disabled
    fn compute_keys(
        &self,
        identity: &TemplateIdentity,
        requests: &[RenderRequest],
    ) -> Vec<Option<CacheKey>> {
        requests
            .iter()
            .map(|r| {
                self.cache_enabled
                    .then(|| CacheKey::compute(identity, &r.props, r.width, r.height))
            })
            .collect()
    }

    /// Serve the whole batch from cache if every key is present
    ///
    /// Returns `None` when any entry is missing; the engine path then
    /// re-checks each key individually.
    async fn try_fast_path(
        &self,
        requests: &[RenderRequest],
        keys: &[Option<CacheKey>],
    ) -> Option<Vec<RenderOutcome>> {
        let lookups = join_all(keys.iter().map(|key| async move {
            match key {
                Some(key) => self.store.get(key).await,
                None => None,
            }
        }))
        .await;

        if lookups.iter().any(Option::is_none) {
            return None;
        }

        let mut outcomes = Vec::with_capacity(requests.len());
        for (request, bytes) in requests.iter().zip(lookups) {
            // Lookups are all Some here
            let bytes = bytes.unwrap_or_default();
            let outcome = match write_output(&request.output_path, &bytes).await {
                Ok(()) => RenderOutcome::ok(request.output_path.clone(), true),
                Err(e) => RenderOutcome::failed(request.output_path.clone(), e.to_string()),
            };
            outcomes.push(outcome);
        }
        Some(outcomes)
    }

    /// Render one request, folding any failure into its outcome
    async fn process_one(
        &self,
        template: &dyn Template,
        session: &dyn RenderSession,
        request: &RenderRequest,
        key: Option<&CacheKey>,
    ) -> RenderOutcome {
        match self.try_one(template, session, request, key).await {
            Ok(cached) => RenderOutcome::ok(request.output_path.clone(), cached),
            Err(e) => {
                warn!("Card render failed for {}: {}", request.output_path.display(), e);
                RenderOutcome::failed(request.output_path.clone(), e.to_string())
            }
        }
    }

    async fn try_one(
        &self,
        template: &dyn Template,
        session: &dyn RenderSession,
        request: &RenderRequest,
        key: Option<&CacheKey>,
    ) -> CardsmithResult<bool> {
        // A duplicate key earlier in the batch may have filled this
        // entry since the fast-path probe, so check again.
        if let Some(key) = key {
            if let Some(bytes) = self.store.get(key).await {
                write_output(&request.output_path, &bytes).await?;
                return Ok(true);
            }
        }

        let html = template.render(&request.props).await?;
        let bytes = session
            .render_page(&html, request.width, request.height)
            .await?;

        write_output(&request.output_path, &bytes).await?;
        debug!(
            "Rendered {} ({}x{}, {} bytes)",
            request.output_path.display(),
            request.width,
            request.height,
            bytes.len()
        );

        if let Some(key) = key {
            self.store.put(key, &bytes).await;
        }
        Ok(false)
    }
}

/// Write image bytes to an output path, creating parent directories
async fn write_output(path: &Path, bytes: &[u8]) -> CardsmithResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CardsmithError::io(format!("creating directory {}", parent.display()), e))?;
        }
    }
    fs::write(path, bytes)
        .await
        .map_err(|e| CardsmithError::io(format!("writing image to {}", path.display()), e))
}
