//! Rendering module
//!
//! Owns the render capability interface, the bundle-backed engine, and the
//! template halves a rendered page is wrapped in.

pub mod bundle;
pub mod stream;
pub mod template;

use std::sync::Arc;

use crate::config::AssetsConfig;

// Re-export commonly used types
pub use bundle::BundleRenderer;
pub use stream::{RenderContext, RenderError, RenderEvent, RenderSink, RenderStream, Renderer};
pub use template::{state_script, Template};

/// Artifact load failure, surfaced at startup or on dev reload
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// One build cycle's worth of rendering state.
///
/// Renderer and template halves always come from the same build cycle; a
/// reload constructs a whole new runtime and swaps it in, so in-flight
/// requests keep whichever runtime they captured.
pub struct SsrRuntime {
    pub renderer: Arc<dyn Renderer>,
    pub template: Template,
}

impl SsrRuntime {
    /// Load the server bundle and template from the build output on disk
    pub async fn load(assets: &AssetsConfig) -> Result<Self, LoadError> {
        if !assets.bundle.is_file() {
            return Err(format!("server bundle not found: {}", assets.bundle.display()).into());
        }

        let source = tokio::fs::read_to_string(&assets.template)
            .await
            .map_err(|e| format!("failed to read template {}: {e}", assets.template.display()))?;

        let template = Template::parse(&source)
            .map_err(|e| format!("invalid template {}: {e}", assets.template.display()))?;

        Ok(Self {
            renderer: Arc::new(BundleRenderer::new(&assets.runner, &assets.bundle)),
            template,
        })
    }

    /// Build a runtime from parts (renderer mocks in tests)
    pub fn from_parts(renderer: Arc<dyn Renderer>, template: Template) -> Self {
        Self { renderer, template }
    }
}
