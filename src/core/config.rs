use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Load configuration from the environment. `DATABASE_URL` is the only
/// mandatory variable; everything else has a local-development default.
pub fn load() -> Result<AppConfig> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    let port = std::env::var("PORT")
        .ok()
        .map(|p| p.parse::<u16>())
        .transpose()
        .context("PORT is not a valid port number")?
        .unwrap_or(3001);

    Ok(AppConfig {
        database: DatabaseConfig { url },
        server: ServerConfig { port },
    })
}
