use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub idle_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS; cookies require a concrete origin, not a
    /// wildcard.
    pub origin_url: String,
    /// Production toggles Secure + SameSite=None on the session cookie.
    pub production: bool,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            cookie_name: std::env::var("SESSION_COOKIE").unwrap_or_else(|_| "sessId".into()),
            idle_minutes: std::env::var("SESSION_IDLE_MINUTES")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };
        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            origin_url: std::env::var("ORIGIN_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            production: std::env::var("PRODUCTION")
                .map(|v| v == "1" || v == "true")
                .unwrap_or(false),
            session,
        })
    }
}
