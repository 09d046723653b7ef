//! Application configuration

pub mod prompts;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Primary completion provider (Groq).
    pub groq_api_key: Option<String>,
    /// Fallback completion provider; also serves the vision model used
    /// for image OCR.
    pub siliconflow_api_key: Option<String>,
    /// PDF.co text-conversion service. Optional: PDF uploads degrade to a
    /// "describe what you need" reply without it.
    pub pdfco_api_key: Option<String>,
    /// Directory holding the state database.
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            groq_api_key: env::var("GROQ_API_KEY").ok(),
            siliconflow_api_key: env::var("SILICONFLOW_API_KEY").ok(),
            pdfco_api_key: env::var("PDFCO_API_KEY").ok(),
            data_dir: env::var("DOCSCOUT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
        })
    }

    /// Path of the sqlite state database inside the data directory.
    ///
    /// The stateless HTTP server never opens it; embedders wiring up a
    /// [`crate::store::ConversationStore`] use this to share the
    /// binary's configuration.
    pub fn state_db_path(&self) -> PathBuf {
        self.data_dir.join("docscout.db")
    }
}
