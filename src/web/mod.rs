mod pages;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::FromRef;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::Sessions;
use crate::config::Config;
use crate::Forum;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub forum: Arc<Forum>,
    pub sessions: Sessions,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(forum: Forum, config: Config) -> Self {
        let sessions = Sessions::new(forum.store.clone());
        Self {
            forum: Arc::new(forum),
            sessions,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for Sessions {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the address is invalid or the server fails to start.
pub async fn serve(config: Config, forum: Forum) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let app = create_app(AppState::new(forum, config));

    info!(addr = %addr, "Starting HTTP web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(listener, app)
        .await
        .context("Web server error")?;

    Ok(())
}

/// Create the main application router.
pub fn create_app(state: AppState) -> Router {
    let static_dir = find_static_dir();
    info!(static_dir = ?static_dir, "Serving static files");

    let relative_path = state.config.relative_path.clone();
    let app = Router::new()
        .merge(routes::router())
        .nest_service("/static", ServeDir::new(&static_dir));

    // Mounted under the configured prefix when the forum lives in a subfolder
    let app = if relative_path.is_empty() {
        app
    } else {
        Router::new().nest(&relative_path, app)
    };

    app.layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Find the static files directory.
///
/// Checks `./static` (development), then `/usr/share/forum-activity/static`
/// (installed), and falls back to `./static`.
fn find_static_dir() -> PathBuf {
    let candidates = [
        PathBuf::from("./static"),
        PathBuf::from("/usr/share/forum-activity/static"),
    ];

    for path in &candidates {
        if path.is_dir() {
            return path.clone();
        }
    }

    PathBuf::from("./static")
}
