//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID
    pub gcp_project_id: String,
    /// Cloud Storage bucket holding question pack images
    pub storage_bucket: String,
    /// Local app asset folder that `assets/...` image paths resolve against
    pub assets_root: PathBuf,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    /// Bearer token required on every admin API call
    pub admin_api_token: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            storage_bucket: "test-project.appspot.com".to_string(),
            assets_root: PathBuf::from("assets"),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            admin_api_token: "test_admin_token".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?;

        let admin_api_token = env::var("ADMIN_API_TOKEN")
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing("ADMIN_API_TOKEN"))?;
        if admin_api_token.is_empty() {
            return Err(ConfigError::Invalid("ADMIN_API_TOKEN", "must not be empty".to_string()));
        }

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw.clone()))?,
            Err(_) => 8080,
        };

        Ok(Self {
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| format!("{}.appspot.com", gcp_project_id)),
            assets_root: env::var("ASSETS_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("assets")),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id,
            port,
            admin_api_token,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
