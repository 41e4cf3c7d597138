use std::env;
use std::net::{IpAddr, SocketAddr};

use anyhow::Context;

/// Selects the in-process driver instead of Postgres.
pub const MEMORY_URL: &str = "memory://";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub backend_url: String,
    pub host: IpAddr,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("HOST is not a valid IP address")?;
        let port = match env::var("PORT") {
            Ok(port) => port.parse::<u16>().context("PORT is not a valid port number")?,
            Err(_) => 8000,
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            backend_url: env::var("BACKEND_URL").unwrap_or_default(),
            host,
            port,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            backend_url: String::new(),
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8000,
        }
    }
}
