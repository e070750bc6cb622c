// inertia-demo - example server for the Inertia protocol adapter
//
// Architecture:
// - Config: env > ~/.config/inertia-demo/config.toml > defaults
// - Renderer: HTML layout, asset version, optional SSR backend
// - App (axum): demo routes mounted behind the Inertia middleware

mod app;
mod cli;
mod config;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use config::Config;
use inertia_axum::{
    version, HtmlTemplate, HttpSsrClient, InertiaLayer, Renderer, RendererConfig, SsrClient,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --path)
    if cli::handle_cli() {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let config = Config::from_env();

    // Keep alive until exit so file logs get flushed
    let _file_guard = logging::init(&config.logging);

    let renderer = Arc::new(build_renderer(&config)?);
    tracing::info!(version = renderer.version(), "Renderer ready");

    let layer = InertiaLayer::new(renderer);
    let app = app::router(app::AppState::new(), &layer);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("Server error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_renderer(config: &Config) -> Result<Renderer> {
    let template = match &config.template_path {
        Some(path) => HtmlTemplate::from_file(path)
            .with_context(|| format!("Failed to load template {}", path.display()))?,
        None => {
            HtmlTemplate::parse(app::DEFAULT_LAYOUT).context("Failed to parse built-in layout")?
        }
    };

    // Explicit version wins over the manifest hash
    let version = match (&config.version, &config.manifest_path) {
        (Some(v), _) => v.clone(),
        (None, Some(path)) => version::from_manifest(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?,
        (None, None) => String::new(),
    };

    let ssr = if config.ssr.enabled {
        let client = HttpSsrClient::new(config.ssr.url.clone(), config.ssr.timeout())
            .context("Failed to build SSR client")?;
        tracing::info!(url = %config.ssr.url, "Server-side rendering enabled");
        Some(Arc::new(client) as Arc<dyn SsrClient>)
    } else {
        None
    };

    Ok(Renderer::new(
        template,
        RendererConfig {
            version,
            root_view_id: config.root_view_id.clone(),
            ssr,
            ..Default::default()
        },
    ))
}
