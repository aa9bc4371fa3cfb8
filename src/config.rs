use std::env;

use anyhow::Context;

// Secrets have no built-in fallback: a missing JWT_SECRET or admin credential
// aborts startup instead of silently running with a known default.
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub admin_email: String,
    pub admin_password: String,
    pub port: u16,
    pub photo_dir: String,
    pub photo_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            database_url: require("DATABASE_URL")?,
            jwt_secret: require("JWT_SECRET")?,
            admin_email: require("ADMIN_EMAIL")?,
            admin_password: require("ADMIN_PASSWORD")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            photo_dir: env::var("PHOTO_DIR").unwrap_or_else(|_| "photos".to_string()),
            photo_base_url: env::var("PHOTO_BASE_URL").unwrap_or_else(|_| "/photos".to_string()),
        })
    }
}

fn require(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}
