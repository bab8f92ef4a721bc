use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Which engine backs the shared registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBackend {
    /// Local `typst` binary.
    Cli,
    /// HTTP render service at `RENDER_SERVICE_URL`.
    Remote,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but malformed, or if the remote
/// backend is selected without a service URL.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub render_backend: RenderBackend,
    pub typst_bin: PathBuf,
    pub typst_font_path: Option<PathBuf>,
    pub render_service_url: Option<String>,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    /// Compiler module location handed to the engine on load.
    pub compiler_module_url: String,
    /// Renderer module location handed to the engine on load.
    pub renderer_module_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let render_backend = match optional_env("RENDER_BACKEND").as_deref() {
            None | Some("cli") => RenderBackend::Cli,
            Some("remote") => RenderBackend::Remote,
            Some(other) => bail!("RENDER_BACKEND must be 'cli' or 'remote', got '{other}'"),
        };

        let render_service_url = optional_env("RENDER_SERVICE_URL");
        if render_backend == RenderBackend::Remote && render_service_url.is_none() {
            bail!("RENDER_SERVICE_URL is required when RENDER_BACKEND=remote");
        }

        let typst_bin = optional_env("TYPST_BIN").unwrap_or_else(|| "typst".to_string());
        let typst_font_path = optional_env("TYPST_FONT_PATH").map(PathBuf::from);

        // The CLI engine reads its binary and font directory from the module locations.
        let compiler_module_url = optional_env("COMPILER_MODULE_URL").unwrap_or_else(|| match render_backend {
            RenderBackend::Cli => typst_bin.clone(),
            RenderBackend::Remote => "/v1/compile".to_string(),
        });
        let renderer_module_url = optional_env("RENDERER_MODULE_URL").unwrap_or_else(|| match render_backend {
            RenderBackend::Cli => typst_font_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            RenderBackend::Remote => "/v1/render".to_string(),
        });

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            render_backend,
            typst_bin: PathBuf::from(typst_bin),
            typst_font_path,
            render_service_url,
            page_width_pt: parse_points("PAGE_WIDTH_PT", 612.0)?,
            page_height_pt: parse_points("PAGE_HEIGHT_PT", 792.0)?,
            compiler_module_url,
            renderer_module_url,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_points(key: &str, default: f32) -> Result<f32> {
    let Some(raw) = optional_env(key) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<f32>()
        .with_context(|| format!("{key} must be a number of points"))?;
    if !(value.is_finite() && value > 0.0) {
        bail!("{key} must be positive, got {value}");
    }
    Ok(value)
}
