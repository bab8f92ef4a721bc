//! Remote engine: posts engine input to a hosted typesetting service.
//!
//! The compiler module location is the service's compile endpoint (text source),
//! the renderer module location its render endpoint (precompiled artifacts).
//! Both answer with the SVG document as the response body.
//!
//! Retries are NOT done here. The viewer owns the retry schedule.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::render::engine::{EngineError, EngineLoader, RenderInput, RendererHandle};

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct ServiceError {
    error: ServiceErrorBody,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct RemoteEngine {
    client: Client,
    base_url: String,
    compile_url: Option<String>,
    render_url: Option<String>,
}

impl RemoteEngine {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            compile_url: None,
            render_url: None,
        }
    }

    fn resolve(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("{}/{}", self.base_url, location.trim_start_matches('/'))
        }
    }

    async fn post(&self, url: &str, body: reqwest::Body, content_type: &str) -> Result<String, EngineError> {
        let response = self
            .client
            .post(url)
            .header("content-type", content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| EngineError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EngineError::Http(e.to_string()))?;

        if !status.is_success() {
            // Try to parse error message
            let message = serde_json::from_str::<ServiceError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(if status.is_client_error() {
                EngineError::Compile(message)
            } else {
                EngineError::Http(format!("status {}: {message}", status.as_u16()))
            });
        }

        debug!("Remote render succeeded: {} bytes", text.len());
        Ok(text)
    }
}

#[async_trait]
impl RendererHandle for RemoteEngine {
    async fn configure_compiler(&mut self, module_location: &str) -> Result<(), EngineError> {
        self.compile_url = Some(self.resolve(module_location));
        Ok(())
    }

    async fn configure_renderer(&mut self, module_location: &str) -> Result<(), EngineError> {
        self.render_url = Some(self.resolve(module_location));
        Ok(())
    }

    async fn render_to_svg(&self, input: &RenderInput) -> Result<String, EngineError> {
        match input {
            RenderInput::Source(source) => {
                let url = self.compile_url.as_deref().ok_or_else(|| {
                    EngineError::Configuration("compile endpoint not configured".to_string())
                })?;
                self.post(url, source.clone().into(), "text/plain; charset=utf-8")
                    .await
            }
            RenderInput::Artifact(bytes) => {
                let url = self.render_url.as_deref().ok_or_else(|| {
                    EngineError::Configuration("render endpoint not configured".to_string())
                })?;
                self.post(url, bytes.clone().into(), "application/octet-stream")
                    .await
            }
        }
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}

/// Loader for [`RemoteEngine`].
pub struct RemoteLoader {
    pub base_url: String,
}

#[async_trait]
impl EngineLoader for RemoteLoader {
    async fn load(&self) -> Result<Option<Box<dyn RendererHandle>>, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| EngineError::Load(e.to_string()))?;
        Ok(Some(Box::new(RemoteEngine::new(client, self.base_url.clone()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RemoteEngine {
        RemoteEngine::new(Client::new(), "http://render.local/".to_string())
    }

    #[test]
    fn test_relative_locations_resolve_against_base() {
        assert_eq!(engine().resolve("/v1/compile"), "http://render.local/v1/compile");
        assert_eq!(engine().resolve("v1/render"), "http://render.local/v1/render");
    }

    #[test]
    fn test_absolute_locations_kept() {
        assert_eq!(
            engine().resolve("https://cdn.example.com/compiler"),
            "https://cdn.example.com/compiler"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_engine_rejects_render() {
        let err = engine()
            .render_to_svg(&RenderInput::Source("#doc".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    // ── against a local service ─────────────────────────────────────────────

    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use bytes::Bytes;
    use serde_json::json;

    async fn compile(body: String) -> axum::response::Response {
        if body.contains("#broken") {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": { "message": "unknown variable: x" } })),
            )
                .into_response()
        } else if body.contains("#crash") {
            (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
        } else {
            format!("<svg><text>{}</text></svg>", body.len()).into_response()
        }
    }

    async fn render(headers: HeaderMap, body: Bytes) -> String {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        format!("<svg data-type=\"{content_type}\" data-len=\"{}\"/>", body.len())
    }

    /// Serves the fake render service on an ephemeral port; returns its base URL.
    async fn service() -> String {
        let router = Router::new()
            .route("/v1/compile", post(compile))
            .route("/v1/render", post(render));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn configured(base_url: String) -> RemoteEngine {
        let mut engine = RemoteEngine::new(Client::new(), base_url);
        engine.configure_compiler("/v1/compile").await.unwrap();
        engine.configure_renderer("v1/render").await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_source_success_returns_body() {
        let engine = configured(service().await).await;
        let svg = engine
            .render_to_svg(&RenderInput::Source("#let x = 1".to_string()))
            .await
            .unwrap();
        assert_eq!(svg, "<svg><text>10</text></svg>");
    }

    #[tokio::test]
    async fn test_client_error_maps_to_compile_with_service_message() {
        let engine = configured(service().await).await;
        let err = engine
            .render_to_svg(&RenderInput::Source("#broken".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Compile("unknown variable: x".to_string()));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_http_with_raw_body() {
        let engine = configured(service().await).await;
        let err = engine
            .render_to_svg(&RenderInput::Source("#crash".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Http("status 500: boom".to_string()));
    }

    #[tokio::test]
    async fn test_artifact_posts_octet_stream_to_render_endpoint() {
        let engine = configured(service().await).await;
        let svg = engine
            .render_to_svg(&RenderInput::Artifact(Bytes::from_static(&[0, 1, 2, 3])))
            .await
            .unwrap();
        assert_eq!(
            svg,
            r#"<svg data-type="application/octet-stream" data-len="4"/>"#
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_http_error() {
        let engine = configured("http://127.0.0.1:9".to_string()).await;
        let err = engine
            .render_to_svg(&RenderInput::Source("#doc".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Http(_)));
    }
}
