//! EduVerse · Edutech Backend
//!
//! - Axum HTTP API (courses, AI generation, progress, points, leaderboard)
//! - SQLite persistence (migrated at startup)
//! - Optional Gemini integration (via environment variables)
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   EDUVERSE_DB_PATH     : SQLite file (default "eduverse.db")
//!   GEMINI_API_KEY       : enables AI generation if present
//!   GEMINI_BASE_URL      : default "https://generativelanguage.googleapis.com/v1"
//!   GEMINI_TEXT_MODEL    : default "gemini-2.0-flash"
//!   GEMINI_IMAGE_MODEL   : default "imagen-3.0-generate-002"
//!   EDUVERSE_CONFIG_PATH : path to TOML config (prompt overrides)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod config;
mod db;
mod domain;
mod error;
mod gemini;
mod protocol;
mod routes;
mod state;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    // Build shared application state (database, prompts, Gemini client).
    // Schema migrations run inside, before any request can arrive.
    let state = Arc::new(AppState::new()?);

    // Build the HTTP router with routes, CORS and tracing layers.
    let app = build_router(state.clone());

    // Read port from env or default to 3000.
    let addr: SocketAddr = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

    let listener = TcpListener::bind(addr).await?;
    info!(target: "eduverse_backend", %addr, "HTTP server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
