//! Engine loader: lazy, single-flight initialization of the transcoding
//! engine through the local-asset / remote-fallback protocol.
//!
//! The loader is the only shared mutable resource in a conversion run. Its
//! state machine is `Unloaded -> Loading -> Ready`; a caller that observes
//! `Loading` awaits the existing in-flight operation instead of starting a
//! duplicate load, and a failed load rolls back to `Unloaded` so a later
//! call can retry rather than being permanently poisoned.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use df_core::config::EngineConfig;
use df_core::events::{ConvertEvent, EngineSource, EventBus};
use df_core::{Error, Result};

use crate::assets::{self, BundleManifest, ENGINE_ASSETS};
use crate::engine::{ProcessEngine, TranscodeEngine};

type SharedLoad = Shared<BoxFuture<'static, std::result::Result<Arc<ProcessEngine>, Arc<Error>>>>;

/// Observable loader state (the in-flight handle itself stays private).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unloaded,
    Loading,
    Ready,
}

enum LoadState {
    Unloaded,
    Loading(SharedLoad),
    Ready(Arc<ProcessEngine>),
}

/// Anything that can produce a ready [`TranscodeEngine`].
///
/// The batch orchestrator works against this seam; tests substitute a
/// provider that hands out a scripted fake.
#[async_trait]
pub trait EngineProvider: Send + Sync {
    /// Return a ready engine, loading it first if necessary.
    async fn engine(&self) -> Result<Arc<dyn TranscodeEngine>>;
}

/// Everything the load protocol needs, detached from the loader so the
/// in-flight future can own it.
#[derive(Clone)]
struct LoadContext {
    config: EngineConfig,
    client: reqwest::Client,
    events: Arc<EventBus>,
}

/// Lazily initializes the transcoding engine exactly once per process,
/// sharing the eventual handle (or failure) among all concurrent callers.
pub struct EngineLoader {
    ctx: LoadContext,
    state: Arc<Mutex<LoadState>>,
}

impl EngineLoader {
    /// Create a loader. The engine is not touched until
    /// [`ensure_ready`](Self::ensure_ready) is first called.
    pub fn new(config: EngineConfig, events: Arc<EventBus>) -> Self {
        Self {
            ctx: LoadContext {
                config,
                client: reqwest::Client::new(),
                events,
            },
            state: Arc::new(Mutex::new(LoadState::Unloaded)),
        }
    }

    /// Current state of the loader.
    pub fn current_state(&self) -> EngineState {
        match &*self.state.lock() {
            LoadState::Unloaded => EngineState::Unloaded,
            LoadState::Loading(_) => EngineState::Loading,
            LoadState::Ready(_) => EngineState::Ready,
        }
    }

    /// Return the ready engine, loading it first if necessary.
    ///
    /// Idempotent and safe under concurrent invocation: all callers that
    /// arrive before resolution await the same underlying load attempt and
    /// observe the same handle or the same failure. Once `Ready`, this is
    /// O(1) and performs no network traffic.
    pub async fn ensure_ready(&self) -> Result<Arc<ProcessEngine>> {
        let load = {
            let mut state = self.state.lock();
            match &*state {
                LoadState::Ready(engine) => return Ok(engine.clone()),
                LoadState::Loading(load) => load.clone(),
                LoadState::Unloaded => {
                    let ctx = self.ctx.clone();
                    let shared_state = Arc::clone(&self.state);
                    let load: SharedLoad = async move {
                        let result = ctx.load().await.map(Arc::new).map_err(Arc::new);
                        match &result {
                            Ok(engine) => {
                                *shared_state.lock() = LoadState::Ready(engine.clone());
                            }
                            Err(e) => {
                                // Roll back so a later call can retry.
                                *shared_state.lock() = LoadState::Unloaded;
                                ctx.events.emit(ConvertEvent::EngineLoadFailed {
                                    error: e.to_string(),
                                });
                            }
                        }
                        result
                    }
                    .boxed()
                    .shared();
                    *state = LoadState::Loading(load.clone());
                    load
                }
            }
        };

        load.await.map_err(|e| match &*e {
            Error::EngineLoad { message } => Error::engine_load(message.clone()),
            other => Error::engine_load(other.to_string()),
        })
    }
}

#[async_trait]
impl EngineProvider for EngineLoader {
    async fn engine(&self) -> Result<Arc<dyn TranscodeEngine>> {
        let engine = self.ensure_ready().await?;
        Ok(engine as Arc<dyn TranscodeEngine>)
    }
}

impl LoadContext {
    /// The load protocol: probe the local bundle, fall back to the remote
    /// bundle, materialize assets into the cache dir, initialize the engine.
    async fn load(&self) -> Result<ProcessEngine> {
        let cache = self.config.resolved_cache_dir();

        self.events.emit(ConvertEvent::EngineLoading {
            phase: "probing local assets".into(),
        });
        let missing = assets::probe_local(&self.client, &self.config).await;

        let source = if missing.is_empty() {
            match self.materialize(EngineSource::Local, &cache).await {
                Ok(()) => EngineSource::Local,
                Err(local_err) => {
                    // Probes passed but a fetch failed; the asset server is
                    // flaky, so try the remote bundle before giving up.
                    tracing::warn!(
                        "local bundle materialization failed: {local_err}; trying remote"
                    );
                    self.fetch_remote(&cache).await.map_err(|remote_err| {
                        Error::engine_load(format!(
                            "local bundle failed ({local_err}); remote bundle failed ({remote_err})"
                        ))
                    })?;
                    EngineSource::Remote
                }
            }
        } else {
            tracing::info!("local engine assets unreachable: {}", missing.join(", "));
            self.fetch_remote(&cache).await.map_err(|remote_err| {
                Error::engine_load(format!(
                    "local assets unreachable ({}); remote bundle failed: {remote_err}",
                    missing.join(", ")
                ))
            })?;
            EngineSource::Remote
        };

        match std::fs::read_to_string(cache.join("manifest.json")) {
            Ok(raw) => match serde_json::from_str::<BundleManifest>(&raw) {
                Ok(manifest) => tracing::info!("engine bundle version {}", manifest.version),
                Err(e) => tracing::warn!("unparseable bundle manifest: {e}"),
            },
            Err(e) => tracing::warn!("bundle manifest unreadable: {e}"),
        }

        self.events.emit(ConvertEvent::EngineLoading {
            phase: "initializing engine".into(),
        });
        let timeout = Duration::from_secs(self.config.command_timeout_secs.max(1));
        let engine = ProcessEngine::initialize(cache.join("ffmpeg"), timeout).await?;

        self.events.emit(ConvertEvent::EngineReady { source });
        tracing::info!("engine ready via {source:?} bundle");
        Ok(engine)
    }

    async fn fetch_remote(&self, cache: &Path) -> Result<()> {
        self.events.emit(ConvertEvent::EngineLoading {
            phase: "fetching remote bundle".into(),
        });
        self.materialize(EngineSource::Remote, cache).await
    }

    /// Fetch every bundle asset from the chosen source into the cache dir.
    async fn materialize(&self, source: EngineSource, cache: &Path) -> Result<()> {
        for spec in ENGINE_ASSETS {
            let url = match source {
                EngineSource::Local => spec.local_url(&self.config),
                EngineSource::Remote => spec.remote_url(&self.config),
            };
            let dest = cache.join(spec.name);
            let bytes = assets::fetch_to(&self.client, &url, &dest).await?;
            if spec.executable {
                assets::mark_executable(&dest)?;
            }
            tracing::debug!("materialized {} ({bytes} bytes) from {url}", spec.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // A body that passes ProcessEngine's version check when executed.
    const FAKE_ENGINE: &[u8] = b"#!/bin/sh\nexit 0\n";

    async fn mount_bundle(server: &MockServer, prefix: &str) {
        Mock::given(method("GET"))
            .and(path(format!("{prefix}/manifest.json")))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"version": "0.12.10"}"#),
            )
            .mount(server)
            .await;
        for name in ["ffmpeg", "ffprobe"] {
            Mock::given(method("GET"))
                .and(path(format!("{prefix}/{name}")))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(FAKE_ENGINE.to_vec()))
                .mount(server)
                .await;
        }
    }

    fn loader_for(
        local_base: String,
        remote_base: String,
        cache: &tempfile::TempDir,
    ) -> (EngineLoader, Arc<EventBus>) {
        let events = Arc::new(EventBus::default());
        let config = EngineConfig {
            local_base_url: local_base,
            remote_bundle_base: remote_base.clone(),
            remote_core_base: remote_base,
            cache_dir: Some(cache.path().to_path_buf()),
            command_timeout_secs: 10,
        };
        (EngineLoader::new(config, events.clone()), events)
    }

    #[tokio::test]
    async fn loads_from_local_bundle() {
        let local = MockServer::start().await;
        mount_bundle(&local, "/engine").await;
        let cache = tempfile::tempdir().unwrap();

        let (loader, events) = loader_for(
            format!("{}/engine", local.uri()),
            "http://127.0.0.1:1/remote".into(),
            &cache,
        );
        let mut rx = events.subscribe();

        loader.ensure_ready().await.unwrap();
        assert_eq!(loader.current_state(), EngineState::Ready);
        assert!(cache.path().join("ffmpeg").exists());

        let mut saw_ready = false;
        while let Ok(event) = rx.try_recv() {
            if let ConvertEvent::EngineReady { source } = event {
                assert_eq!(source, EngineSource::Local);
                saw_ready = true;
            }
        }
        assert!(saw_ready);
    }

    #[tokio::test]
    async fn falls_back_to_remote_bundle() {
        // Local base points at a closed port; remote serves the bundle.
        let remote = MockServer::start().await;
        mount_bundle(&remote, "/core/0.12").await;
        let cache = tempfile::tempdir().unwrap();

        let (loader, events) = loader_for(
            "http://127.0.0.1:1/engine".into(),
            format!("{}/core/0.12", remote.uri()),
            &cache,
        );
        let mut rx = events.subscribe();

        loader.ensure_ready().await.unwrap();
        assert_eq!(loader.current_state(), EngineState::Ready);

        let mut saw_remote = false;
        while let Ok(event) = rx.try_recv() {
            if let ConvertEvent::EngineReady { source } = event {
                saw_remote = source == EngineSource::Remote;
            }
        }
        assert!(saw_remote);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let local = MockServer::start().await;
        mount_bundle(&local, "/engine").await;
        let cache = tempfile::tempdir().unwrap();

        let (loader, _events) = loader_for(
            format!("{}/engine", local.uri()),
            "http://127.0.0.1:1/remote".into(),
            &cache,
        );

        let (a, b, c) = tokio::join!(
            loader.ensure_ready(),
            loader.ensure_ready(),
            loader.ensure_ready()
        );
        let a = a.unwrap();
        assert!(Arc::ptr_eq(&a, &b.unwrap()));
        assert!(Arc::ptr_eq(&a, &c.unwrap()));

        // One probe plus one fetch per asset; never a duplicate sequence.
        let requests = local.received_requests().await.unwrap();
        let ffmpeg_hits = requests
            .iter()
            .filter(|r| r.url.path() == "/engine/ffmpeg")
            .count();
        assert_eq!(ffmpeg_hits, 2);
    }

    #[tokio::test]
    async fn ready_loader_makes_no_further_probes() {
        let local = MockServer::start().await;
        mount_bundle(&local, "/engine").await;
        let cache = tempfile::tempdir().unwrap();

        let (loader, _events) = loader_for(
            format!("{}/engine", local.uri()),
            "http://127.0.0.1:1/remote".into(),
            &cache,
        );

        loader.ensure_ready().await.unwrap();
        let before = local.received_requests().await.unwrap().len();

        loader.ensure_ready().await.unwrap();
        let after = local.received_requests().await.unwrap().len();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn failure_rolls_back_and_allows_retry() {
        let server = MockServer::start().await;
        let cache = tempfile::tempdir().unwrap();

        // Nothing mounted yet: both bundles 404.
        let (loader, _events) = loader_for(
            format!("{}/engine", server.uri()),
            format!("{}/remote", server.uri()),
            &cache,
        );

        let err = loader.ensure_ready().await.unwrap_err();
        assert!(matches!(err, Error::EngineLoad { .. }));
        let message = err.to_string();
        assert!(message.contains("manifest.json"), "got: {message}");
        assert_eq!(loader.current_state(), EngineState::Unloaded);

        // The assets appear; a fresh attempt succeeds.
        mount_bundle(&server, "/engine").await;
        loader.ensure_ready().await.unwrap();
        assert_eq!(loader.current_state(), EngineState::Ready);
    }

    #[tokio::test]
    async fn sibling_callers_observe_the_same_failure() {
        let cache = tempfile::tempdir().unwrap();
        let (loader, _events) = loader_for(
            "http://127.0.0.1:1/engine".into(),
            "http://127.0.0.1:1/remote".into(),
            &cache,
        );

        let (a, b) = tokio::join!(loader.ensure_ready(), loader.ensure_ready());
        assert!(matches!(a, Err(Error::EngineLoad { .. })));
        assert!(matches!(b, Err(Error::EngineLoad { .. })));
        assert_eq!(loader.current_state(), EngineState::Unloaded);
    }

    #[tokio::test]
    async fn provider_hands_out_trait_object() {
        let local = MockServer::start().await;
        mount_bundle(&local, "/engine").await;
        let cache = tempfile::tempdir().unwrap();

        let (loader, _events) = loader_for(
            format!("{}/engine", local.uri()),
            "http://127.0.0.1:1/remote".into(),
            &cache,
        );

        let engine = loader.engine().await.unwrap();
        engine.write_file("probe.bin", b"x").await.unwrap();
        assert_eq!(engine.read_file("probe.bin").await.unwrap(), b"x");
        engine.remove_file("probe.bin");
    }
}
