//! Renders a few demo cards with the built-in template
//!
//! Requires a Chromium/Chrome binary on the PATH (or set via config).
//! Run twice to watch the second pass hit the cache.
//!
//! ```sh
//! cargo run --example render_site
//! ```

use cardsmith::{
    BatchRenderer, BuiltinResolver, CacheStore, CardsmithResult, ChromiumEngine, RenderRequest,
    RendererConfig,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> CardsmithResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardsmith=debug".into()),
        )
        .init();

    let config = RendererConfig::default();
    let engine = Arc::new(match &config.engine.executable {
        Some(path) => ChromiumEngine::with_executable(path),
        None => ChromiumEngine::new(),
    });
    let store = CacheStore::new(&config.cache.dir, &config.cache.namespace, &config.cache.ext);
    let renderer = BatchRenderer::new(engine, store, &config.batch)?;

    let pages = [
        ("demo-out/welcome.png", json!({
            "title": "Welcome to cardsmith",
            "description": "Batch social-card rendering at build time",
            "site": "cardsmith.dev",
            "tags": ["rust", "og-image"]
        })),
        ("demo-out/errors.png", json!({
            "title": "Graceful degradation & per-page isolation",
            "site": "cardsmith.dev"
        })),
        ("demo-out/cache.png", json!({
            "title": "Content-addressed caching",
            "description": "Identical props, identical pixels, zero work",
            "tags": ["cache"]
        })),
    ];

    let requests: Vec<_> = pages
        .into_iter()
        .map(|(path, props)| {
            let props = match props {
                serde_json::Value::Object(map) => map,
                _ => unreachable!(),
            };
            RenderRequest::new(props, path, config.card.width, config.card.height)
        })
        .collect();

    let outcomes = renderer.render(&BuiltinResolver, &requests).await?;

    for outcome in outcomes {
        match &outcome.error {
            None => println!(
                "{} {}",
                if outcome.cached { "cached " } else { "rendered" },
                outcome.output_path.display()
            ),
            Some(error) => println!("failed   {}: {}", outcome.output_path.display(), error),
        }
    }
    Ok(())
}
