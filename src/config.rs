use std::fmt::Display;
use std::str::FromStr;

use log::{info, warn};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown store {other:?}, expected postgres or memory")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    pub jwt_secret: Vec<u8>,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        let store: StoreKind = try_load("STORE", "postgres")?;
        let database_url = dotenv::var("DATABASE_URL").ok();
        if store == StoreKind::Postgres && database_url.is_none() {
            return Err(Error::ConfigError("DATABASE_URL is required when STORE=postgres".into()));
        }
        let jwt_secret = dotenv::var("JWT_SECRET")
            .map_err(|_| Error::ConfigError("JWT_SECRET is not set".into()))?
            .into_bytes();
        Ok(Self {
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:8000")?,
            store,
            database_url,
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            run_migrations: try_load("RUN_MIGRATIONS", "true")?,
            jwt_secret,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, Error>
where
    T::Err: Display,
{
    let value = dotenv::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });
    value.parse().map_err(|e| {
        warn!("invalid {key} value: {e}");
        Error::ConfigError(format!("invalid {key}: {e}"))
    })
}
