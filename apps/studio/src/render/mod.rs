// Typeset Rendering Client
// Engine lifecycle, the render state machine with fingerprint dedup and
// exponential backoff, and SVG post-processing to the page viewport.

pub mod cli;
pub mod engine;
pub mod remote;
pub mod session;
pub mod svg;
pub mod viewer;

pub use engine::{
    EngineError, EngineLoader, EngineModules, EngineRegistry, RenderContent, RenderInput,
    RendererHandle,
};
pub use session::{RenderState, RenderStatus, MAX_ATTEMPTS};
pub use viewer::{RenderError, RenderOutcome, Viewer};
