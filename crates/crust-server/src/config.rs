//! Process configuration, resolved once from the environment at startup.

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};

pub const ENV_ADDR: &str = "CRUST_ADDR";
pub const ENV_STORE: &str = "CRUST_STORE";
pub const ENV_JWT_SECRET: &str = "CRUST_JWT_SECRET";
pub const ENV_ENVIRONMENT: &str = "CRUST_ENV";

const DEFAULT_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 8081);
const DEV_JWT_SECRET: &str = "crust-development-secret";

/// Which persistence backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "postgres" => Some(StoreBackend::Postgres),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub backend: StoreBackend,
    pub jwt_secret: String,
    pub environment: String,
}

impl ServerConfig {
    /// Resolve the full server configuration from environment variables.
    ///
    /// The token secret is required for the persistent backend. Memory mode
    /// is a throwaway dev mode, so it falls back to a fixed development
    /// secret rather than refusing to boot.
    pub fn from_env() -> Result<Self> {
        let addr = match std::env::var(ENV_ADDR) {
            Ok(raw) => raw
                .parse::<SocketAddr>()
                .with_context(|| format!("{ENV_ADDR} is not a valid socket address: {raw}"))?,
            Err(_) => SocketAddr::from(DEFAULT_ADDR),
        };

        let backend = match std::env::var(ENV_STORE) {
            Ok(raw) => match StoreBackend::parse(&raw) {
                Some(b) => b,
                None => bail!("{ENV_STORE} must be \"postgres\" or \"memory\", got {raw:?}"),
            },
            Err(_) => StoreBackend::Postgres,
        };

        let jwt_secret = match std::env::var(ENV_JWT_SECRET) {
            Ok(s) if !s.is_empty() => s,
            _ if backend == StoreBackend::Memory => {
                tracing::warn!(
                    "{ENV_JWT_SECRET} not set; using a development-only token secret"
                );
                DEV_JWT_SECRET.to_string()
            }
            _ => bail!("{ENV_JWT_SECRET} is not set"),
        };

        let environment =
            std::env::var(ENV_ENVIRONMENT).unwrap_or_else(|_| "development".to_string());

        Ok(Self { addr, backend, jwt_secret, environment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parse_accepts_only_known_values() {
        assert_eq!(StoreBackend::parse("postgres"), Some(StoreBackend::Postgres));
        assert_eq!(StoreBackend::parse("memory"), Some(StoreBackend::Memory));
        assert_eq!(StoreBackend::parse("mongo"), None);
        assert_eq!(StoreBackend::parse("Postgres"), None);
    }
}
