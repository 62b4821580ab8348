use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Duration;

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-secret-key-here",
];

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("STUDYBUDDY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("STUDYBUDDY_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let host = var("STUDYBUDDY_HOST", "0.0.0.0");
        let port: u16 = var("STUDYBUDDY_PORT", "8000")
            .parse()
            .context("STUDYBUDDY_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        let access_minutes: i64 = var("STUDYBUDDY_ACCESS_TOKEN_MINUTES", "60")
            .parse()
            .context("STUDYBUDDY_ACCESS_TOKEN_MINUTES must be an integer")?;
        let refresh_hours: i64 = var("STUDYBUDDY_REFRESH_TOKEN_HOURS", "24")
            .parse()
            .context("STUDYBUDDY_REFRESH_TOKEN_HOURS must be an integer")?;
        if access_minutes <= 0 || refresh_hours <= 0 {
            bail!("token lifetimes must be positive");
        }

        let cors_origins = var("STUDYBUDDY_CORS_ORIGINS", DEFAULT_CORS_ORIGINS)
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            addr,
            db_path: var("STUDYBUDDY_DB_PATH", "studybuddy.db").into(),
            jwt_secret,
            access_ttl: Duration::minutes(access_minutes),
            refresh_ttl: Duration::hours(refresh_hours),
            cors_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = load(&[("STUDYBUDDY_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(config.addr.port(), 8000);
        assert_eq!(config.db_path, PathBuf::from("studybuddy.db"));
        assert_eq!(config.access_ttl, Duration::minutes(60));
        assert_eq!(config.refresh_ttl, Duration::hours(24));
        assert_eq!(config.cors_origins, vec!["http://localhost:3000", "http://127.0.0.1:3000"]);
    }

    #[test]
    fn missing_or_placeholder_secret_is_refused() {
        assert!(load(&[]).is_err());
        assert!(load(&[("STUDYBUDDY_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("STUDYBUDDY_JWT_SECRET", "a-real-secret"),
            ("STUDYBUDDY_HOST", "127.0.0.1"),
            ("STUDYBUDDY_PORT", "9100"),
            ("STUDYBUDDY_CORS_ORIGINS", "https://app.example.com, ,"),
        ])
        .unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:9100");
        assert_eq!(config.cors_origins, vec!["https://app.example.com"]);

        assert!(load(&[("STUDYBUDDY_JWT_SECRET", "s"), ("STUDYBUDDY_PORT", "http")]).is_err());
    }
}
