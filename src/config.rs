use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::quotes::{CompensationPolicy, DEFAULT_CONFIRMATION_DELAY};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
    pub quotes: QuoteConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding the per-user cart and search history blobs.
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Notification function endpoint. Notifications are disabled when unset.
    pub function_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuoteConfig {
    pub compensation: CompensationPolicy,
    /// Grace period of `POST /users/cart/submit/confirmation`.
    pub confirmation_delay: Duration,
}

/// Loads the configuration from the process environment.
pub fn load() -> Result<Config> {
    let config = from_lookup(|key| std::env::var(key).ok())?;
    info!(
        "Configuration loaded (port {}, storage {})",
        config.server.port,
        config.storage.dir.display()
    );
    Ok(config)
}

/// Builds the configuration from an arbitrary variable source.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    Ok(Config {
        server: ServerConfig {
            host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "SERVER_PORT", 3000)?,
        },
        database: DatabaseConfig {
            url: optional("DATABASE_URL").context("DATABASE_URL must be set")?,
            pool_size: parse_or(&lookup, "DATABASE_POOL_SIZE", 10)?,
        },
        storage: StorageConfig {
            dir: optional("CART_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/storage")),
        },
        notifications: NotificationConfig {
            function_url: optional("NOTIFICATION_FUNCTION_URL"),
            api_key: optional("NOTIFICATION_API_KEY"),
        },
        quotes: QuoteConfig {
            compensation: parse_or(&lookup, "QUOTE_COMPENSATION", CompensationPolicy::None)?,
            confirmation_delay: Duration::from_secs(parse_or(
                &lookup,
                "QUOTE_CONFIRMATION_DELAY_SECS",
                DEFAULT_CONFIRMATION_DELAY.as_secs(),
            )?),
        },
    })
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key).filter(|value| !value.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|err| anyhow!("Invalid {} value {:?}: {}", key, value, err)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() {
        let config =
            from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/quotes")])).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.quotes.confirmation_delay, Duration::from_secs(5));
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(config.notifications.function_url, None);
        assert_eq!(config.quotes.compensation, CompensationPolicy::None);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert!(from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let result = from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/quotes"),
            ("SERVER_PORT", "eighty"),
        ]));
        assert!(result.is_err());

        let result = from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/quotes"),
            ("QUOTE_COMPENSATION", "rollback"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn compensation_can_be_switched_to_delete() {
        let config = from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/quotes"),
            ("QUOTE_COMPENSATION", "delete"),
            ("QUOTE_CONFIRMATION_DELAY_SECS", "12"),
            ("NOTIFICATION_FUNCTION_URL", "https://functions.example.com/notify"),
        ]))
        .unwrap();

        assert_eq!(config.quotes.compensation, CompensationPolicy::DeleteInserted);
        assert_eq!(config.quotes.confirmation_delay, Duration::from_secs(12));
        assert_eq!(
            config.notifications.function_url.as_deref(),
            Some("https://functions.example.com/notify")
        );
    }
}
