use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use studio::config::{Config, RenderBackend};
use studio::render::cli::CliLoader;
use studio::render::remote::RemoteLoader;
use studio::render::{EngineLoader, EngineModules, EngineRegistry};
use studio::routes::build_router;
use studio::state::AppState;
use studio::typeset::default_page_layout;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Studio API v{}", env!("CARGO_PKG_VERSION"));

    // Engine loader for the configured backend; the engine itself loads on first render
    let loader: Arc<dyn EngineLoader> = match config.render_backend {
        RenderBackend::Cli => Arc::new(CliLoader),
        RenderBackend::Remote => Arc::new(RemoteLoader {
            base_url: config.render_service_url.clone().unwrap_or_default(),
        }),
    };
    let registry = EngineRegistry::new(
        loader,
        EngineModules {
            compiler: config.compiler_module_url.clone(),
            renderer: config.renderer_module_url.clone(),
        },
    );
    info!("Render backend: {:?}", config.render_backend);

    let mut layout = default_page_layout();
    layout.width_pt = config.page_width_pt;
    layout.height_pt = config.page_height_pt;
    info!(
        "Page layout: {}x{}pt, {:?} {}pt",
        layout.width_pt, layout.height_pt, layout.font, layout.font_size_pt
    );

    // Build app state
    let state = AppState {
        registry,
        layout,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
