use std::sync::Arc;

use crate::config::Config;
use crate::render::EngineRegistry;
use crate::typeset::PageLayout;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Process-wide engine slot. Every request's viewer acquires from it, so
    /// the engine loads once.
    pub registry: Arc<EngineRegistry>,
    /// Page the rendered SVG is fitted to.
    pub layout: PageLayout,
}
