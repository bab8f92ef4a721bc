//! Render session: the explicit state value threaded through every render.
//!
//! ```text
//! Unloaded → Loading → Ready → Rendering → Rendered | Failed
//!                        ↑          │
//!                        └──────────┘  (retry after backoff)
//! ```
//!
//! The session only records transitions. Scheduling, engine calls and
//! cancellation belong to the viewer.

use std::time::Duration;

use serde::Serialize;

use crate::render::engine::Fingerprint;

/// Total render attempts per request, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry. Doubles for each further retry.
pub const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    Unloaded,
    Loading,
    Ready,
    Rendering,
    Rendered,
    Failed,
}

/// Snapshot for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderStatus {
    pub state: RenderState,
    /// Zero-based attempt currently in progress (or last made).
    pub attempt: u32,
}

impl RenderStatus {
    /// Human-readable status line for the viewer chrome.
    pub fn message(&self) -> String {
        match self.state {
            RenderState::Unloaded | RenderState::Loading => "Loading renderer…".to_string(),
            RenderState::Ready => "Ready".to_string(),
            RenderState::Rendering if self.attempt == 0 => "Rendering…".to_string(),
            RenderState::Rendering => format!(
                "Rendering… attempt {} of {}",
                self.attempt + 1,
                MAX_ATTEMPTS
            ),
            RenderState::Rendered => "Rendered".to_string(),
            RenderState::Failed => "Render failed".to_string(),
        }
    }
}

/// Backoff before retry number `attempt + 1`: `200ms × 2^attempt`.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS << attempt)
}

#[derive(Debug, Clone)]
pub struct RenderSession {
    state: RenderState,
    attempt: u32,
    fingerprint: Option<Fingerprint>,
    svg: Option<String>,
}

impl Default for RenderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSession {
    pub fn new() -> Self {
        Self {
            state: RenderState::Unloaded,
            attempt: 0,
            fingerprint: None,
            svg: None,
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn status(&self) -> RenderStatus {
        RenderStatus {
            state: self.state,
            attempt: self.attempt,
        }
    }

    /// Last successfully rendered (post-processed) SVG.
    pub fn svg(&self) -> Option<&str> {
        self.svg.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self.state, RenderState::Unloaded | RenderState::Loading)
    }

    pub fn begin_loading(&mut self) {
        self.state = RenderState::Loading;
    }

    pub fn loaded(&mut self) {
        self.state = RenderState::Ready;
    }

    /// Load failed; the next mount starts over.
    pub fn load_failed(&mut self) {
        self.state = RenderState::Unloaded;
    }

    /// True if `fingerprint` warrants an engine call.
    ///
    /// Identical content is skipped unless a retry is in progress.
    pub fn should_render(&self, fingerprint: &Fingerprint) -> bool {
        self.attempt > 0 || self.fingerprint.as_ref() != Some(fingerprint)
    }

    /// Enters `Rendering` for new content. Resets the attempt counter.
    pub fn begin(&mut self, fingerprint: Fingerprint) {
        self.state = RenderState::Rendering;
        self.attempt = 0;
        self.fingerprint = Some(fingerprint);
    }

    pub fn succeed(&mut self, svg: String) {
        self.state = RenderState::Rendered;
        self.attempt = 0;
        self.svg = Some(svg);
    }

    /// Records a failed attempt.
    ///
    /// Returns the backoff to wait before retrying, or `None` when the attempt
    /// budget is spent. On exhaustion the fingerprint is cleared so the same
    /// content can be submitted again.
    pub fn fail(&mut self) -> Option<Duration> {
        if self.attempt + 1 < MAX_ATTEMPTS {
            let delay = backoff_delay(self.attempt);
            self.attempt += 1;
            Some(delay)
        } else {
            self.state = RenderState::Failed;
            self.attempt = 0;
            self.fingerprint = None;
            None
        }
    }

    /// A render was cancelled before finishing. Forgets its fingerprint so the
    /// same content can be submitted again; the previous SVG is kept.
    pub fn abandon(&mut self) {
        if !self.is_loaded() {
            return;
        }
        self.state = if self.svg.is_some() {
            RenderState::Rendered
        } else {
            RenderState::Ready
        };
        self.attempt = 0;
        self.fingerprint = None;
    }

    /// Teardown: back to a fresh, unloaded session.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
