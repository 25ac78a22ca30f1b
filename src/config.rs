use std::env;

use chrono::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/docpanel.db";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
pub const DEFAULT_STATIC_DIR: &str = "./static";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub session_ttl: Duration,
    pub static_dir: String,
    pub seed_demo: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let port = lookup("PORT")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let ttl_hours = lookup("SESSION_TTL_HOURS")
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|hours| *hours > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_HOURS);

        let static_dir = lookup("STATIC_DIR")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string());

        let seed_demo = lookup("SEED_DEMO").as_deref() == Some("true");

        Self {
            database_url,
            port,
            session_ttl: Duration::hours(ttl_hours),
            static_dir,
            seed_demo,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.session_ttl, Duration::hours(DEFAULT_SESSION_TTL_HOURS));
        assert_eq!(config.static_dir, DEFAULT_STATIC_DIR);
        assert!(!config.seed_demo);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn values_are_read_from_the_environment() {
        let config = config_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("PORT", "9090"),
            ("SESSION_TTL_HOURS", "2"),
            ("SEED_DEMO", "true"),
        ]);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.port, 9090);
        assert_eq!(config.session_ttl, Duration::hours(2));
        assert!(config.seed_demo);
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[("PORT", "http"), ("SESSION_TTL_HOURS", "-3")]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.session_ttl, Duration::hours(DEFAULT_SESSION_TTL_HOURS));
    }
}
