// Application state module
// Owns the configuration and the swappable rendering runtime

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::types::Config;
use crate::render::SsrRuntime;

/// Shared application state
///
/// The rendering runtime starts out unset (warming up) and is replaced
/// wholesale by the startup path or the dev reload path. Requests clone the
/// `Arc` once and keep rendering with it even if a reload swaps in a newer
/// runtime mid-flight.
pub struct AppState {
    pub config: Config,
    runtime: RwLock<Option<Arc<SsrRuntime>>>,

    // Cached config value for fast access without locks
    pub cached_access_log: AtomicBool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let cached_access_log = AtomicBool::new(config.logging.access_log);
        Self {
            config,
            runtime: RwLock::new(None),
            cached_access_log,
        }
    }

    /// Capture the current rendering runtime, if one is installed
    pub async fn runtime(&self) -> Option<Arc<SsrRuntime>> {
        self.runtime.read().await.clone()
    }

    /// Atomically swap in a freshly built rendering runtime
    pub async fn install_runtime(&self, runtime: SsrRuntime) {
        let mut slot = self.runtime.write().await;
        *slot = Some(Arc::new(runtime));
    }

    /// Whether access logging is enabled (lock-free)
    pub fn access_log_enabled(&self) -> bool {
        self.cached_access_log.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Template;
    use async_trait::async_trait;

    struct NoopRenderer;

    #[async_trait]
    impl crate::render::Renderer for NoopRenderer {
        async fn render(&self, _ctx: crate::render::RenderContext) -> crate::render::RenderStream {
            let (sink, stream) = crate::render::RenderStream::channel(1);
            sink.complete(None).await;
            stream
        }
    }

    #[tokio::test]
    async fn test_runtime_starts_unset_and_swaps() {
        let config = Config::load_from("definitely-missing-config").unwrap();
        let state = AppState::new(config);
        assert!(state.runtime().await.is_none());

        let template = Template::parse("<body><!-- APP --></body>").unwrap();
        state
            .install_runtime(SsrRuntime::from_parts(Arc::new(NoopRenderer), template))
            .await;
        assert!(state.runtime().await.is_some());
    }

    #[tokio::test]
    async fn test_captured_runtime_survives_swap() {
        let config = Config::load_from("definitely-missing-config").unwrap();
        let state = AppState::new(config);

        let first = Template::parse("a<!-- APP -->b").unwrap();
        state
            .install_runtime(SsrRuntime::from_parts(Arc::new(NoopRenderer), first))
            .await;
        let captured = state.runtime().await.unwrap();

        let second = Template::parse("c<!-- APP -->d").unwrap();
        state
            .install_runtime(SsrRuntime::from_parts(Arc::new(NoopRenderer), second))
            .await;

        // The in-flight reference still sees the old build cycle
        assert_eq!(captured.template.head, "a");
        assert_eq!(state.runtime().await.unwrap().template.head, "c");
    }
}
