//! Application configuration loaded from environment variables.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GCP project ID (Firestore project and identity-token audience)
    pub gcp_project_id: String,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Stripe API secret key
    pub stripe_secret_key: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// For local development, secrets can be set via a `.env` file.
    /// In production, Cloud Run secret bindings inject them as env vars.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),

            stripe_secret_key: env::var("STRIPE_SECRET_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRIPE_SECRET_KEY"))?,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "careslot-test".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 5000,
            stripe_secret_key: "sk_test_dummy".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
