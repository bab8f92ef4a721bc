//! Viewer: drives one render session against the shared engine.
//!
//! # Ordering
//! `render` takes `&mut self`, so renders on one viewer are strictly sequential.
//! Separate viewers share the engine through the [`EngineRegistry`] and render
//! independently.
//!
//! # Cancellation
//! Each viewer owns a `CancellationToken`. `unmount` cancels it; an in-flight
//! engine call or backoff wait observes the cancellation, and the render
//! returns `Cancelled` without touching session state or invoking callbacks.
//! A fresh token is installed so the viewer can be mounted again.
//!
//! Hosts may also cancel the token directly. That cancels the render in
//! progress (or the next one, if none is running); the render that observes it
//! abandons its session entry and installs a fresh token, so later renders run
//! normally.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::render::engine::{EngineError, EngineRegistry, Fingerprint, RenderContent, RendererHandle};
use crate::render::session::{RenderSession, RenderState, RenderStatus, MAX_ATTEMPTS};
use crate::render::svg::fit_to_page;
use crate::typeset::PageLayout;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    #[error("Renderer failed to load: {0}")]
    Load(EngineError),

    #[error("Render failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: EngineError },
}

/// How a `render` call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Rendered { svg: String, attempts: u32 },
    /// Content matched the last rendered fingerprint; the engine was not called.
    Skipped,
    Failed(RenderError),
    /// The viewer was torn down mid-render.
    Cancelled,
}

pub struct Viewer {
    registry: Arc<EngineRegistry>,
    engine: Option<Arc<dyn RendererHandle>>,
    layout: PageLayout,
    session: RenderSession,
    token: CancellationToken,
}

impl Viewer {
    pub fn new(registry: Arc<EngineRegistry>, layout: PageLayout) -> Self {
        Self {
            registry,
            engine: None,
            layout,
            session: RenderSession::new(),
            token: CancellationToken::new(),
        }
    }

    pub fn status(&self) -> RenderStatus {
        self.session.status()
    }

    /// The current render result, if any.
    pub fn svg(&self) -> Option<&str> {
        self.session.svg()
    }

    /// Token cancelled by `unmount`. Hosts may cancel it from elsewhere; that
    /// cancels one render, after which the viewer replaces the token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Acquires the shared engine: `Unloaded → Loading → Ready`.
    pub async fn mount(&mut self) -> Result<(), EngineError> {
        if self.engine.is_some() {
            return Ok(());
        }

        self.session.begin_loading();
        match self.registry.acquire().await {
            Ok(engine) => {
                self.engine = Some(engine);
                self.session.loaded();
                Ok(())
            }
            Err(e) => {
                error!("Renderer failed to load: {e}");
                self.session.load_failed();
                Err(e)
            }
        }
    }

    /// Tears the viewer down. Pending work observes the cancelled token.
    pub fn unmount(&mut self) {
        self.token.cancel();
        self.token = CancellationToken::new();
        self.session.reset();
        self.engine = None;
    }

    /// Renders `content`, retrying with exponential backoff.
    ///
    /// Exactly one of the callbacks fires for `Rendered` and `Failed` outcomes;
    /// neither fires for `Skipped` or `Cancelled`.
    pub async fn render<S, E>(
        &mut self,
        content: impl Into<RenderContent>,
        on_success: S,
        on_error: E,
    ) -> RenderOutcome
    where
        S: FnOnce(&str),
        E: FnOnce(&RenderError),
    {
        let outcome = self.run(content.into(), on_success, on_error).await;
        if outcome == RenderOutcome::Cancelled && self.token.is_cancelled() {
            debug!("Render cancelled by host; installing a fresh token");
            self.token = CancellationToken::new();
            self.session.abandon();
        }
        outcome
    }

    async fn run<S, E>(&mut self, content: RenderContent, on_success: S, on_error: E) -> RenderOutcome
    where
        S: FnOnce(&str),
        E: FnOnce(&RenderError),
    {
        let token = self.token.clone();
        if token.is_cancelled() {
            return RenderOutcome::Cancelled;
        }

        if self.engine.is_none() {
            let mounted = tokio::select! {
                biased;
                _ = token.cancelled() => return RenderOutcome::Cancelled,
                r = self.mount() => r,
            };
            if let Err(e) = mounted {
                let err = RenderError::Load(e);
                on_error(&err);
                return RenderOutcome::Failed(err);
            }
        }
        let Some(engine) = self.engine.clone() else {
            return RenderOutcome::Cancelled;
        };

        let input = content.classify();
        let fingerprint = Fingerprint::of(&input);
        if !self.session.should_render(&fingerprint) {
            debug!("Content unchanged since last render; skipping");
            return RenderOutcome::Skipped;
        }
        self.session.begin(fingerprint);

        loop {
            let attempt = self.session.attempt();
            debug!(
                "Render attempt {}/{} (backend: {})",
                attempt + 1,
                MAX_ATTEMPTS,
                engine.backend()
            );

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return RenderOutcome::Cancelled,
                r = engine.render_to_svg(&input) => r,
            };

            let result = match result {
                Ok(svg) if svg.trim().is_empty() => Err(EngineError::EmptyResult),
                Ok(svg) => {
                    // Post-process on the next tick, after the raw result has landed.
                    tokio::task::yield_now().await;
                    if token.is_cancelled() {
                        return RenderOutcome::Cancelled;
                    }
                    fit_to_page(&svg, &self.layout)
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(svg) => {
                    self.session.succeed(svg.clone());
                    on_success(&svg);
                    return RenderOutcome::Rendered {
                        svg,
                        attempts: attempt + 1,
                    };
                }
                Err(e) => match self.session.fail() {
                    Some(delay) => {
                        warn!(
                            "Render attempt {} failed ({e}), retrying after {}ms...",
                            attempt + 1,
                            delay.as_millis()
                        );
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => return RenderOutcome::Cancelled,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    None => {
                        error!("Render failed after {MAX_ATTEMPTS} attempts: {e}");
                        let err = RenderError::Exhausted {
                            attempts: MAX_ATTEMPTS,
                            last: e,
                        };
                        on_error(&err);
                        return RenderOutcome::Failed(err);
                    }
                },
            }
        }
    }

    pub fn state(&self) -> RenderState {
        self.session.state()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::render::engine::testing::*;
    use crate::typeset::default_page_layout;

    fn viewer(script: Arc<EngineScript>) -> Viewer {
        Viewer::new(registry(script), default_page_layout())
    }

    fn compile_error() -> Result<String, EngineError> {
        Err(EngineError::Compile("unknown variable".to_string()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let script = EngineScript::new(
            vec![compile_error(), compile_error()],
            Ok(PAGE_SVG.to_string()),
        );
        let mut viewer = viewer(script.clone());
        let successes = AtomicUsize::new(0);
        let errors = AtomicUsize::new(0);

        let start = tokio::time::Instant::now();
        let outcome = viewer
            .render(
                "#let resume = (:)",
                |_| {
                    successes.fetch_add(1, Ordering::SeqCst);
                },
                |_| {
                    errors.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        assert!(matches!(outcome, RenderOutcome::Rendered { attempts: 3, .. }));
        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
        assert_eq!(script.calls(), 3);
        assert!(start.elapsed() >= Duration::from_millis(600));
        assert_eq!(viewer.status().attempt, 0);
        assert_eq!(viewer.state(), RenderState::Rendered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_engine_exhausts_after_three_attempts() {
        let script = EngineScript::new(vec![], compile_error());
        let mut viewer = viewer(script.clone());
        let errors = AtomicUsize::new(0);

        let outcome = viewer
            .render(
                "#broken",
                |_| panic!("must not succeed"),
                |_| {
                    errors.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        assert!(matches!(
            outcome,
            RenderOutcome::Failed(RenderError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(script.calls(), 3);
        assert_eq!(viewer.state(), RenderState::Failed);

        // Nothing else is scheduled.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_content_not_rendered_twice() {
        let script = EngineScript::new(vec![], Ok(PAGE_SVG.to_string()));
        let mut viewer = viewer(script.clone());

        let first = viewer.render("#same", |_| {}, |_| {}).await;
        let second = viewer.render("#same", |_| {}, |_| {}).await;

        assert!(matches!(first, RenderOutcome::Rendered { .. }));
        assert_eq!(second, RenderOutcome::Skipped);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_changed_content_renders_again() {
        let script = EngineScript::new(vec![], Ok(PAGE_SVG.to_string()));
        let mut viewer = viewer(script.clone());

        viewer.render("#one", |_| {}, |_| {}).await;
        viewer.render("#two", |_| {}, |_| {}).await;
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_svg_is_retried() {
        let script = EngineScript::new(vec![Ok("   ".to_string())], Ok(PAGE_SVG.to_string()));
        let mut viewer = viewer(script.clone());

        let outcome = viewer.render("#doc", |_| {}, |_| {}).await;
        assert!(matches!(outcome, RenderOutcome::Rendered { attempts: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_is_post_processed() {
        let script = EngineScript::new(vec![], Ok(PAGE_SVG.to_string()));
        let mut viewer = viewer(script);
        let mut delivered = String::new();

        viewer
            .render("#doc", |svg| delivered = svg.to_string(), |_| {})
            .await;

        assert!(delivered.contains(r#"font-size="15""#));
        assert!(delivered.contains(r##"fill="#ffffff""##));
        assert_eq!(viewer.svg(), Some(delivered.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_reported_once() {
        let registry = EngineRegistry::new(
            Arc::new(ScriptedLoader {
                script: EngineScript::new(vec![], Ok(PAGE_SVG.to_string())),
                yields_handle: false,
            }),
            Default::default(),
        );
        let mut viewer = Viewer::new(registry, default_page_layout());
        let errors = AtomicUsize::new(0);

        let outcome = viewer
            .render(
                "#doc",
                |_| {},
                |e| {
                    assert!(matches!(e, RenderError::Load(_)));
                    errors.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        assert!(matches!(outcome, RenderOutcome::Failed(RenderError::Load(_))));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(viewer.state(), RenderState::Unloaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_backoff_skips_callbacks() {
        let script = EngineScript::new(vec![], compile_error());
        let mut viewer = viewer(script.clone());
        let token = viewer.cancellation_token();

        tokio::spawn(async move {
            // First attempt fails instantly; cancel inside the 200ms backoff.
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });

        let outcome = viewer
            .render(
                "#doc",
                |_| panic!("stale success"),
                |_| panic!("stale error"),
            )
            .await;

        assert_eq!(outcome, RenderOutcome::Cancelled);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_artifact_not_rendered_twice() {
        let script = EngineScript::new(vec![], Ok(PAGE_SVG.to_string()));
        let mut viewer = viewer(script.clone());
        let artifact: Vec<u8> = vec![0x00, 0x9f, 0x92, 0x96, 0x01];

        let first = viewer.render(artifact.clone(), |_| {}, |_| {}).await;
        let second = viewer.render(artifact, |_| {}, |_| {}).await;

        assert!(matches!(first, RenderOutcome::Rendered { .. }));
        assert_eq!(second, RenderOutcome::Skipped);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_cancellation_affects_one_render() {
        let script = EngineScript::new(vec![], Ok(PAGE_SVG.to_string()));
        let mut viewer = viewer(script.clone());
        viewer.mount().await.unwrap();
        viewer.cancellation_token().cancel();

        let cancelled = viewer
            .render("#doc", |_| panic!("cancelled render"), |_| panic!("cancelled render"))
            .await;
        assert_eq!(cancelled, RenderOutcome::Cancelled);
        assert_eq!(script.calls(), 0);
        assert!(!viewer.cancellation_token().is_cancelled());

        let outcome = viewer.render("#doc", |_| {}, |_| {}).await;
        assert!(matches!(outcome, RenderOutcome::Rendered { attempts: 1, .. }));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_cancelled_mid_retry_can_be_resubmitted() {
        let script = EngineScript::new(vec![compile_error()], Ok(PAGE_SVG.to_string()));
        let mut viewer = viewer(script.clone());
        let token = viewer.cancellation_token();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });
        let cancelled = viewer.render("#doc", |_| {}, |_| {}).await;
        assert_eq!(cancelled, RenderOutcome::Cancelled);
        assert_eq!(viewer.state(), RenderState::Ready);

        // Same content is not skipped: the cancelled attempt never rendered it.
        let outcome = viewer.render("#doc", |_| {}, |_| {}).await;
        assert!(matches!(outcome, RenderOutcome::Rendered { .. }));
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_resets_session() {
        let script = EngineScript::new(vec![], Ok(PAGE_SVG.to_string()));
        let mut viewer = viewer(script.clone());
        viewer.render("#doc", |_| {}, |_| {}).await;

        viewer.unmount();
        assert_eq!(viewer.state(), RenderState::Unloaded);
        assert!(viewer.svg().is_none());

        // Same content renders again after remount.
        let outcome = viewer.render("#doc", |_| {}, |_| {}).await;
        assert!(matches!(outcome, RenderOutcome::Rendered { .. }));
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewers_share_one_engine_load() {
        let script = EngineScript::new(vec![], Ok(PAGE_SVG.to_string()));
        let registry = registry(script.clone());
        let mut a = Viewer::new(registry.clone(), default_page_layout());
        let mut b = Viewer::new(registry.clone(), default_page_layout());

        let (ra, rb) = tokio::join!(a.mount(), b.mount());
        assert!(ra.is_ok() && rb.is_ok());
        assert_eq!(registry.load_count(), 1);
    }
}
