use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Admin credential for the dashboard session
    pub admin_username: String,
    pub admin_password: Secret<String>,

    // Outbound webhook endpoint (n8n or similar); optional
    pub webhook_url: Option<String>,

    // Facility-local UTC offset in hours, used for calendar-day math
    pub timezone_offset_hours: i32,

    // HMAC key for QR badge payloads
    pub qr_signing_key: Secret<String>,

    // Security
    pub session_secret: Secret<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            admin_username: config
                .get("admin_username")
                .unwrap_or_else(|_| "admin".to_string()),
            admin_password: Secret::new(config.get("admin_password")?),

            webhook_url: config.get("webhook_url").ok(),

            // Tashkent by default
            timezone_offset_hours: config.get("timezone_offset_hours").unwrap_or(5),

            qr_signing_key: Secret::new(config.get("qr_signing_key")?),

            session_secret: Secret::new(config.get("session_secret")?),
        })
    }
}
