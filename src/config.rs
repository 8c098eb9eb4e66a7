use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server_address: String,
    pub database_url: String,
    pub environment: String,
    /// Key for reset tokens and session auth hashes.
    pub secret_key: String,
    /// Absolute origin used when building links for outgoing email.
    pub base_url: String,
    pub default_from_email: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_starttls: bool,
    pub password_reset_timeout_secs: i64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let env = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let defaults = AppConfig::default();

        let s = Config::builder()
            .set_default("server_address", defaults.server_address)?
            .set_default("database_url", defaults.database_url)?
            .set_default("environment", env.clone())?
            .set_default("secret_key", defaults.secret_key)?
            .set_default("base_url", defaults.base_url)?
            .set_default("default_from_email", defaults.default_from_email)?
            .set_default("smtp_port", i64::from(defaults.smtp_port))?
            .set_default("smtp_starttls", defaults.smtp_starttls)?
            .set_default(
                "password_reset_timeout_secs",
                defaults.password_reset_timeout_secs,
            )?
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Add local configuration (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "ACCOUNTS_"
            .add_source(Environment::with_prefix("ACCOUNTS"))
            .build()
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

        Ok(s.try_deserialize()?)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_address: "0.0.0.0:3000".to_string(),
            database_url: "sqlite:data/accounts.db".to_string(),
            environment: "development".to_string(),
            secret_key: "your-secret-key-change-in-production".to_string(),
            base_url: "http://localhost:3000".to_string(),
            default_from_email: "webmaster@localhost".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_starttls: true,
            // Three days.
            password_reset_timeout_secs: 259_200,
            admin_username: None,
            admin_password: None,
        }
    }
}
