//! Engine abstraction: the seam between the viewer and a typesetting engine.
//!
//! The viewer never touches a concrete engine. It asks the shared
//! [`EngineRegistry`] for a [`RendererHandle`]; the registry loads one through an
//! [`EngineLoader`] at most once per process and configures its compiler and
//! renderer modules before handing it out. Concurrent first callers all wait on
//! the same load.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Number of leading characters (text) or bytes (artifacts) inspected for kind
/// detection and fingerprinting.
pub const PEEK_LEN: usize = 100;

/// Leading character that marks a payload as text source.
pub const SOURCE_MARKER: char = '#';

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("Engine loaded but exposed no handle: {0}")]
    HandleUnavailable(String),

    #[error("Engine load failed: {0}")]
    Load(String),

    #[error("Module configuration failed: {0}")]
    Configuration(String),

    #[error("Compilation failed: {0}")]
    Compile(String),

    #[error("Engine returned an empty SVG")]
    EmptyResult,

    #[error("Malformed SVG: {0}")]
    MalformedSvg(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Inputs
// ────────────────────────────────────────────────────────────────────────────

/// What a host hands to the viewer.
#[derive(Debug, Clone)]
pub enum RenderContent {
    Text(String),
    Binary(Bytes),
}

impl From<String> for RenderContent {
    fn from(s: String) -> Self {
        RenderContent::Text(s)
    }
}

impl From<&str> for RenderContent {
    fn from(s: &str) -> Self {
        RenderContent::Text(s.to_string())
    }
}

impl From<Vec<u8>> for RenderContent {
    fn from(b: Vec<u8>) -> Self {
        RenderContent::Binary(Bytes::from(b))
    }
}

impl From<Bytes> for RenderContent {
    fn from(b: Bytes) -> Self {
        RenderContent::Binary(b)
    }
}

/// What an engine receives, after kind detection.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderInput {
    /// Textual source program.
    Source(String),
    /// Precompiled binary artifact.
    Artifact(Bytes),
}

impl RenderContent {
    /// Detects the input kind.
    ///
    /// Binary payloads whose first `PEEK_LEN` bytes read as text starting with
    /// `SOURCE_MARKER` are source; any other binary payload is an artifact.
    pub fn classify(self) -> RenderInput {
        match self {
            RenderContent::Text(s) => RenderInput::Source(s),
            RenderContent::Binary(bytes) => {
                let head = &bytes[..bytes.len().min(PEEK_LEN)];
                if String::from_utf8_lossy(head).starts_with(SOURCE_MARKER) {
                    RenderInput::Source(String::from_utf8_lossy(&bytes).into_owned())
                } else {
                    RenderInput::Artifact(bytes)
                }
            }
        }
    }
}

/// Cheap identity of an input: its first `PEEK_LEN` units.
///
/// Changes past the prefix are not detected. Callers that need a forced
/// re-render use a fresh viewer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    Text(String),
    Hex(String),
}

impl Fingerprint {
    pub fn of(input: &RenderInput) -> Self {
        match input {
            RenderInput::Source(s) => Fingerprint::Text(s.chars().take(PEEK_LEN).collect()),
            RenderInput::Artifact(b) => Fingerprint::Hex(
                b.iter()
                    .take(PEEK_LEN)
                    .map(|byte| format!("{byte:02x}"))
                    .collect(),
            ),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine traits
// ────────────────────────────────────────────────────────────────────────────

/// A loaded typesetting engine.
///
/// `configure_*` run once, before the handle is shared. `render_to_svg` is
/// called for every render attempt.
#[async_trait]
pub trait RendererHandle: Send + Sync {
    async fn configure_compiler(&mut self, module_location: &str) -> Result<(), EngineError>;

    async fn configure_renderer(&mut self, module_location: &str) -> Result<(), EngineError>;

    async fn render_to_svg(&self, input: &RenderInput) -> Result<String, EngineError>;

    /// Short identifier for logs ("typst-cli", "remote").
    fn backend(&self) -> &'static str;
}

/// Produces an engine handle.
///
/// `Ok(None)` means the engine resource loaded but no handle became available.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> Result<Option<Box<dyn RendererHandle>>, EngineError>;
}

/// Locations of the two engine sub-modules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineModules {
    pub compiler: String,
    pub renderer: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Shared registry
// ────────────────────────────────────────────────────────────────────────────

/// Process-wide engine slot shared by every viewer.
///
/// Only one load ever succeeds. A failed load leaves the slot empty, so the
/// next viewer to mount tries again.
pub struct EngineRegistry {
    loader: Arc<dyn EngineLoader>,
    modules: EngineModules,
    handle: OnceCell<Arc<dyn RendererHandle>>,
    loads: AtomicUsize,
}

impl EngineRegistry {
    pub fn new(loader: Arc<dyn EngineLoader>, modules: EngineModules) -> Arc<Self> {
        Arc::new(Self {
            loader,
            modules,
            handle: OnceCell::new(),
            loads: AtomicUsize::new(0),
        })
    }

    /// True once an engine has been loaded and configured.
    pub fn is_ready(&self) -> bool {
        self.handle.initialized()
    }

    /// Number of times the loader has been invoked.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Returns the shared handle, loading and configuring it on first use.
    pub async fn acquire(&self) -> Result<Arc<dyn RendererHandle>, EngineError> {
        self.handle
            .get_or_try_init(|| async {
                self.loads.fetch_add(1, Ordering::SeqCst);
                debug!("Loading typesetting engine...");

                let mut handle = self.loader.load().await?.ok_or_else(|| {
                    EngineError::HandleUnavailable("loader returned no handle".to_string())
                })?;

                handle.configure_compiler(&self.modules.compiler).await?;
                handle.configure_renderer(&self.modules.renderer).await?;

                info!("Typesetting engine ready (backend: {})", handle.backend());
                Ok::<_, EngineError>(Arc::from(handle))
            })
            .await
            .cloned()
    }
}
