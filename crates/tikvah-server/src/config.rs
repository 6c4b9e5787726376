use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Base of the personal links in confirmation mail.
    pub portal_url: String,
    pub default_round_minutes: u32,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let port = var("TIKVAH_PORT", "3000")
            .parse()
            .context("TIKVAH_PORT must be a port number")?;
        let default_round_minutes = var("TIKVAH_DEFAULT_ROUND_MINUTES", "7")
            .parse()
            .context("TIKVAH_DEFAULT_ROUND_MINUTES must be a whole number")?;
        tikvah_engine::round_seconds_from_minutes(default_round_minutes)?;

        Ok(Self {
            host: var("TIKVAH_HOST", "0.0.0.0"),
            port,
            db_path: PathBuf::from(var("TIKVAH_DB_PATH", "tikvah.db")),
            portal_url: var("TIKVAH_PORTAL_URL", "http://localhost:3000"),
            default_round_minutes,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
