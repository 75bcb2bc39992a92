use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

/// Ten years.
pub const MAX_STATS_RECENT_WINDOW_DAYS: i64 = 3_650;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub feed_default_page_size: usize,
    pub feed_max_page_size: usize,
    pub stats_recent_window_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let store_backend: StoreBackend = env_or_parse("STORE_BACKEND", "memory")?;
        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("missing required env var: DATABASE_URL"));
        }

        let feed_default_page_size: usize = env_or_parse("FEED_DEFAULT_PAGE_SIZE", "20")?;
        let feed_max_page_size: usize = env_or_parse("FEED_MAX_PAGE_SIZE", "100")?;
        if feed_default_page_size == 0 || feed_default_page_size > feed_max_page_size {
            return Err(anyhow!(
                "invalid FEED_DEFAULT_PAGE_SIZE: must be between 1 and FEED_MAX_PAGE_SIZE ({})",
                feed_max_page_size
            ));
        }

        let stats_recent_window_days: i64 = env_or_parse("STATS_RECENT_WINDOW_DAYS", "30")?;
        validate_recent_window_days(stats_recent_window_days)?;

        Ok(Self {
            http_addr,
            store_backend,
            database_url,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            feed_default_page_size,
            feed_max_page_size,
            stats_recent_window_days,
        })
    }

    pub fn stats_recent_window(&self) -> time::Duration {
        time::Duration::days(self.stats_recent_window_days)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 25,
            db_connect_timeout_seconds: 5,
            db_idle_timeout_seconds: 300,
            db_max_lifetime_seconds: 1800,
            feed_default_page_size: 20,
            feed_max_page_size: 100,
            stats_recent_window_days: 30,
        }
    }
}

fn validate_recent_window_days(days: i64) -> Result<()> {
    if !(0..=MAX_STATS_RECENT_WINDOW_DAYS).contains(&days) {
        return Err(anyhow!(
            "invalid STATS_RECENT_WINDOW_DAYS: must be between 0 and {}",
            MAX_STATS_RECENT_WINDOW_DAYS
        ));
    }
    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
