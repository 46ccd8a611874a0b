//! tmplshelf-service - search and serve a directory of JSON templates over HTTP

mod error;
mod routes;
mod state;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use state::{AppState, SharedState};
use std::path::PathBuf;
use std::sync::Arc;
use tmplshelf_core::Config;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Parser)]
#[command(name = "tmplshelf-service")]
#[command(about = "Search and serve JSON templates over HTTP", long_about = None)]
struct Cli {
    /// TOML config file (defaults are used when omitted)
    #[arg(long, env = "TMPLSHELF_CONFIG")]
    config: Option<PathBuf>,

    /// Templates root directory (overrides [index].root)
    #[arg(long, env = "TEMPLATES_ROOT")]
    root: Option<PathBuf>,

    /// Bind address (overrides [server].bind)
    #[arg(long, env = "BIND")]
    bind: Option<String>,

    /// Port (overrides [server].port)
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

impl Cli {
    fn into_config(self) -> tmplshelf_core::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(root) = self.root {
            config.index.root = root;
        }
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        Ok(config)
    }
}

fn app(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/refresh", post(routes::refresh))
        .route("/templates", get(routes::list_templates))
        .route("/raw", get(routes::raw))
        .route("/download", get(routes::download))
        .route("/template/{id}", get(routes::template_by_id))
        .fallback(routes::not_found)
        .method_not_allowed_fallback(routes::method_not_allowed)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tmplshelf_service=info,tmplshelf_core=info,tower_http=info".into()),
        )
        .init();

    let config = Cli::parse().into_config()?;
    let addr = config.listen_addr();
    tracing::info!(root = %config.index.root.display(), "serving templates");

    let state: SharedState = Arc::new(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("tmplshelf-service listening on {}", addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
