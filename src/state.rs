//! Application state: database handle, prompts, and the optional Gemini
//! client. Built once at startup and shared via `Arc`.
//!
//! Migrations run here, before the router exists, so no request handler
//! ever has to care whether the schema is in place.

use tracing::{info, instrument};

use crate::config::{load_config_from_env, Prompts};
use crate::db::Db;
use crate::gemini::Gemini;

pub struct AppState {
    pub db: Db,
    pub ai: Option<Gemini>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, open + migrate the database,
    /// init the Gemini client if an API key is present.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let prompts = load_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        let db_path =
            std::env::var("EDUVERSE_DB_PATH").unwrap_or_else(|_| "eduverse.db".into());
        let db = Db::open(&db_path)?;
        db.migrate()?;
        info!(target: "eduverse_backend", %db_path, "database opened");

        let ai = Gemini::from_env();
        if let Some(g) = &ai {
            info!(target: "eduverse_backend", base_url = %g.base_url, text_model = %g.text_model, image_model = %g.image_model, "Gemini enabled.");
        } else {
            info!(target: "eduverse_backend", "Gemini disabled (no GEMINI_API_KEY). Generation endpoints will report upstream errors.");
        }

        Ok(Self { db, ai, prompts })
    }
}
