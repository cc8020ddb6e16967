//! Integration tests for cardsmith
//!
//! Exercises the batch orchestrator through the public API with
//! instrumented engines and templates, so no real browser is needed.

use async_trait::async_trait;
use cardsmith::{
    BatchConfig, BatchRenderer, CacheKey, CacheStore, CardsmithError, CardsmithResult,
    RenderEngine, RenderRequest, RenderSession, Template, TemplateIdentity, TemplateResolver,
};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Deterministic stand-in for rendered PNG bytes
fn fake_png(html: &str, width: u32, height: u32) -> Vec<u8> {
    format!("png:{}x{}:{}", width, height, html).into_bytes()
}

/// Shared counters observed by tests after a batch completes
#[derive(Default)]
struct EngineStats {
    opens: AtomicUsize,
    disposals: AtomicUsize,
    renders: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

/// Engine double that records opens, renders and disposals
struct MockEngine {
    stats: Arc<EngineStats>,
    available: bool,
}

impl MockEngine {
    fn new() -> (Arc<Self>, Arc<EngineStats>) {
        let stats = Arc::new(EngineStats::default());
        (
            Arc::new(Self {
                stats: stats.clone(),
                available: true,
            }),
            stats,
        )
    }

    fn unavailable() -> (Arc<Self>, Arc<EngineStats>) {
        let stats = Arc::new(EngineStats::default());
        (
            Arc::new(Self {
                stats: stats.clone(),
                available: false,
            }),
            stats,
        )
    }
}

#[async_trait]
impl RenderEngine for MockEngine {
    async fn open(&self) -> Option<Box<dyn RenderSession>> {
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return None;
        }
        Some(Box::new(MockSession {
            stats: self.stats.clone(),
        }))
    }

    fn engine_name(&self) -> &'static str {
        "MockEngine"
    }
}

struct MockSession {
    stats: Arc<EngineStats>,
}

#[async_trait]
impl RenderSession for MockSession {
    async fn render_page(&self, html: &str, width: u32, height: u32) -> CardsmithResult<Vec<u8>> {
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_active.fetch_max(active, Ordering::SeqCst);

        // Hold the slot briefly so concurrent calls overlap
        tokio::time::sleep(Duration::from_millis(10)).await;

        self.stats.active.fetch_sub(1, Ordering::SeqCst);
        self.stats.renders.fetch_add(1, Ordering::SeqCst);
        Ok(fake_png(html, width, height))
    }

    async fn dispose(self: Box<Self>) {
        self.stats.disposals.fetch_add(1, Ordering::SeqCst);
    }
}

/// Template that echoes the title prop into a recognizable fragment
struct EchoTemplate;

#[async_trait]
impl Template for EchoTemplate {
    async fn render(&self, props: &Map<String, Value>) -> CardsmithResult<String> {
        if props.get("explode").is_some() {
            return Err(CardsmithError::TemplateRender(
                "template exploded".to_string(),
            ));
        }
        let title = props.get("title").and_then(Value::as_str).unwrap_or("");
        Ok(format!("<h1>{}</h1>", title))
    }

    fn identity(&self) -> TemplateIdentity {
        TemplateIdentity::Builtin
    }
}

struct EchoResolver;

#[async_trait]
impl TemplateResolver for EchoResolver {
    async fn resolve(&self) -> CardsmithResult<Arc<dyn Template>> {
        Ok(Arc::new(EchoTemplate))
    }
}

/// Resolver whose failure must abort the whole batch
struct BrokenResolver;

#[async_trait]
impl TemplateResolver for BrokenResolver {
    async fn resolve(&self) -> CardsmithResult<Arc<dyn Template>> {
        Err(CardsmithError::resolution("cards/post.tmpl", "not found"))
    }
}

fn request(dir: &Path, name: &str, title: &str) -> RenderRequest {
    let mut props = Map::new();
    props.insert("title".to_string(), json!(title));
    RenderRequest::new(props, dir.join(name), 1200, 630)
}

fn renderer(
    engine: Arc<MockEngine>,
    cache_root: &Path,
    concurrency: usize,
    cache: bool,
) -> BatchRenderer {
    let store = CacheStore::new(cache_root, "cards", "png");
    BatchRenderer::new(engine, store, &BatchConfig { concurrency, cache }).unwrap()
}

mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn empty_batch_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let (engine, stats) = MockEngine::new();
        let renderer = renderer(engine, temp.path(), 4, true);

        let outcomes = renderer.render(&EchoResolver, &[]).await.unwrap();

        assert!(outcomes.is_empty());
        assert_eq!(stats.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cold_batch_renders_every_card() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let (engine, stats) = MockEngine::new();
        let renderer = renderer(engine, temp.path(), 1, true);

        let requests = vec![
            request(&out, "a.png", "Alpha"),
            request(&out, "b.png", "Beta"),
            request(&out, "c.png", "Gamma"),
        ];
        let outcomes = renderer.render(&EchoResolver, &requests).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            assert!(outcome.succeeded());
            assert!(!outcome.cached);
            assert!(outcome.output_path.is_file());
        }
        assert_eq!(stats.opens.load(Ordering::SeqCst), 1);
        assert_eq!(stats.disposals.load(Ordering::SeqCst), 1);
        assert_eq!(stats.renders.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rerun_is_served_from_cache_without_engine() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let (engine, stats) = MockEngine::new();
        let renderer = renderer(engine, temp.path(), 2, true);

        let requests = vec![
            request(&out, "a.png", "Alpha"),
            request(&out, "b.png", "Beta"),
        ];

        let first = renderer.render(&EchoResolver, &requests).await.unwrap();
        assert!(first.iter().all(|o| !o.cached));

        let second = renderer.render(&EchoResolver, &requests).await.unwrap();
        assert!(second.iter().all(|o| o.cached && o.succeeded()));

        // The fully-cached rerun never opened the engine
        assert_eq!(stats.opens.load(Ordering::SeqCst), 1);
        assert_eq!(stats.disposals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolution_failure_aborts_batch() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let (engine, stats) = MockEngine::new();
        let renderer = renderer(engine, temp.path(), 2, true);

        let requests = vec![request(&out, "a.png", "Alpha")];
        let result = renderer.render(&BrokenResolver, &requests).await;

        assert!(matches!(
            result,
            Err(CardsmithError::TemplateResolution { .. })
        ));
        assert_eq!(stats.opens.load(Ordering::SeqCst), 0);
        assert!(!out.join("a.png").exists());
    }

    #[tokio::test]
    async fn unavailable_engine_fails_softly() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let (engine, stats) = MockEngine::unavailable();
        let renderer = renderer(engine, temp.path(), 2, true);

        let requests = vec![
            request(&out, "a.png", "Alpha"),
            request(&out, "b.png", "Beta"),
        ];
        let outcomes = renderer.render(&EchoResolver, &requests).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            assert!(!outcome.cached);
            assert_eq!(outcome.error.as_deref(), Some("render engine unavailable"));
            assert!(!outcome.output_path.exists());
        }
        assert_eq!(stats.opens.load(Ordering::SeqCst), 1);
        assert_eq!(stats.disposals.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn one_failing_template_call_is_isolated() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let (engine, stats) = MockEngine::new();
        let renderer = renderer(engine, temp.path(), 2, true);

        let mut poisoned = request(&out, "b.png", "Beta");
        poisoned.props.insert("explode".to_string(), json!(true));

        let requests = vec![
            request(&out, "a.png", "Alpha"),
            poisoned,
            request(&out, "c.png", "Gamma"),
        ];
        let outcomes = renderer.render(&EchoResolver, &requests).await.unwrap();

        let failed: Vec<_> = outcomes.iter().filter(|o| !o.succeeded()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].output_path, out.join("b.png"));
        assert!(failed[0].error.as_deref().unwrap().contains("exploded"));

        assert!(out.join("a.png").is_file());
        assert!(!out.join("b.png").exists());
        assert!(out.join("c.png").is_file());

        // One failure never tears down the session early
        assert_eq!(stats.disposals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn outcomes_preserve_input_order() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let (engine, _stats) = MockEngine::new();
        let renderer = renderer(engine, temp.path(), 3, true);

        let requests: Vec<_> = (0..7)
            .map(|i| request(&out, &format!("card-{}.png", i), &format!("Card {}", i)))
            .collect();
        let outcomes = renderer.render(&EchoResolver, &requests).await.unwrap();

        let expected: Vec<_> = requests.iter().map(|r| r.output_path.clone()).collect();
        let actual: Vec<_> = outcomes.iter().map(|o| o.output_path.clone()).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn concurrency_bound_is_respected() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let (engine, stats) = MockEngine::new();
        let renderer = renderer(engine, temp.path(), 3, false);

        let requests: Vec<_> = (0..9)
            .map(|i| request(&out, &format!("card-{}.png", i), &format!("Card {}", i)))
            .collect();
        renderer.render(&EchoResolver, &requests).await.unwrap();

        assert!(stats.max_active.load(Ordering::SeqCst) <= 3);
        assert_eq!(stats.renders.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn serial_batch_never_overlaps() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let (engine, stats) = MockEngine::new();
        let renderer = renderer(engine, temp.path(), 1, false);

        let requests: Vec<_> = (0..4)
            .map(|i| request(&out, &format!("card-{}.png", i), &format!("Card {}", i)))
            .collect();
        renderer.render(&EchoResolver, &requests).await.unwrap();

        assert_eq!(stats.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rendered_bytes_round_trip_through_disk_and_cache() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let (engine, _stats) = MockEngine::new();
        let renderer = renderer(engine, temp.path(), 1, true);

        let requests = vec![request(&out, "a.png", "Alpha")];
        renderer.render(&EchoResolver, &requests).await.unwrap();

        let expected = fake_png("<h1>Alpha</h1>", 1200, 630);
        let written = std::fs::read(out.join("a.png")).unwrap();
        assert_eq!(written, expected);

        let store = CacheStore::new(temp.path(), "cards", "png");
        let key = CacheKey::compute(
            &TemplateIdentity::Builtin,
            &requests[0].props,
            1200,
            630,
        );
        assert_eq!(store.get(&key).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn duplicate_key_in_later_group_hits_write_through() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let (engine, stats) = MockEngine::new();
        let renderer = renderer(engine, temp.path(), 1, true);

        // Same props and dimensions, different output paths
        let requests = vec![
            request(&out, "first.png", "Same"),
            request(&out, "second.png", "Same"),
        ];
        let outcomes = renderer.render(&EchoResolver, &requests).await.unwrap();

        assert!(!outcomes[0].cached);
        assert!(outcomes[1].cached);
        assert_eq!(stats.renders.load(Ordering::SeqCst), 1);
        assert_eq!(
            std::fs::read(out.join("first.png")).unwrap(),
            std::fs::read(out.join("second.png")).unwrap()
        );
    }

    #[tokio::test]
    async fn disabled_cache_always_renders() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let (engine, stats) = MockEngine::new();
        let renderer = renderer(engine, temp.path(), 2, false);

        let requests = vec![request(&out, "a.png", "Alpha")];

        let first = renderer.render(&EchoResolver, &requests).await.unwrap();
        let second = renderer.render(&EchoResolver, &requests).await.unwrap();

        assert!(!first[0].cached && !second[0].cached);
        assert_eq!(stats.opens.load(Ordering::SeqCst), 2);
        assert_eq!(stats.renders.load(Ordering::SeqCst), 2);
        // Nothing was written through to the cache namespace
        assert!(!temp.path().join("cards").exists());
    }

    #[tokio::test]
    async fn zero_concurrency_is_rejected() {
        let temp = TempDir::new().unwrap();
        let (engine, _stats) = MockEngine::new();
        let store = CacheStore::new(temp.path(), "cards", "png");

        let result = BatchRenderer::new(
            engine,
            store,
            &BatchConfig {
                concurrency: 0,
                cache: true,
            },
        );
        assert!(matches!(result, Err(CardsmithError::OptionInvalid(_))));
    }
}
