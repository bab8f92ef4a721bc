//! Axum route handlers for the Typeset API.

use anyhow::anyhow;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::resume::ResumeDocument;
use crate::render::{RenderError, RenderOutcome, Viewer};
use crate::state::AppState;
use crate::typeset::{compose_document, to_typeset_source, TypesetSource};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SourceResponse {
    pub source: TypesetSource,
}

/// Either a structured resume (composed with the page template) or raw engine
/// source. Exactly one must be present.
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub resume: Option<ResumeDocument>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub svg: String,
    pub attempts: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/typeset/source
///
/// Returns the engine data literal for a resume without rendering it.
pub async fn handle_source(Json(document): Json<ResumeDocument>) -> Json<SourceResponse> {
    Json(SourceResponse {
        source: to_typeset_source(&document),
    })
}

/// POST /api/v1/typeset/render
///
/// Renders one page to SVG through the shared engine, with the viewer's retry
/// policy. Terminal render failures map to 502.
pub async fn handle_render(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderResponse>, AppError> {
    let content = match (request.resume, request.source) {
        (Some(resume), None) => compose_document(&resume, &state.layout),
        (None, Some(source)) if !source.trim().is_empty() => source,
        (None, Some(_)) => return Err(AppError::Validation("source cannot be empty".to_string())),
        (Some(_), Some(_)) => {
            return Err(AppError::Validation(
                "provide either resume or source, not both".to_string(),
            ))
        }
        (None, None) => {
            return Err(AppError::Validation(
                "request must include resume or source".to_string(),
            ))
        }
    };

    let mut viewer = Viewer::new(state.registry.clone(), state.layout.clone());
    match viewer.render(content, |_| {}, |_| {}).await {
        RenderOutcome::Rendered { svg, attempts } => {
            info!("Rendered preview in {attempts} attempt(s) ({} bytes)", svg.len());
            Ok(Json(RenderResponse { svg, attempts }))
        }
        RenderOutcome::Failed(RenderError::Load(e)) => Err(AppError::EngineUnavailable(e)),
        RenderOutcome::Failed(e) => Err(AppError::Render(e)),
        RenderOutcome::Cancelled => Err(AppError::Cancelled),
        RenderOutcome::Skipped => Err(AppError::Internal(anyhow!(
            "fresh viewer skipped its first render"
        ))),
    }
}
