//! Runtime configuration loaded from the environment

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context};

const DEV_JWT_SECRET: &str = "sdc-dev-secret-change-me";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub access_token_hours: i64,
    pub reset_token_minutes: i64,
    pub verify_token_hours: i64,
    pub bcrypt_cost: u32,
    pub cors_allowed_origins: Vec<String>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub unlock_fee: i64,
    pub default_currency: String,
    pub run_migrations: bool,
    pub subscription_sweep_cron: String,
}

impl Config {
    /// Build configuration from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = match lookup("JWT_SECRET_KEY").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET_KEY not set, using development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let config = Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "postgresql://localhost/sdc".to_string()),
            host: parse_or(&lookup, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&lookup, "PORT", 5000)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            access_token_hours: parse_or(&lookup, "JWT_ACCESS_TOKEN_HOURS", 24)?,
            reset_token_minutes: parse_or(&lookup, "RESET_TOKEN_MINUTES", 60)?,
            verify_token_hours: parse_or(&lookup, "VERIFY_TOKEN_HOURS", 72)?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            cors_allowed_origins,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            unlock_fee: parse_or(&lookup, "UNLOCK_FEE", 0)?,
            default_currency: lookup("DEFAULT_CURRENCY").unwrap_or_else(|| "NGN".to_string()),
            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", true)?,
            subscription_sweep_cron: lookup("SUBSCRIPTION_SWEEP_CRON")
                .unwrap_or_else(|| "0 */10 * * * *".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.access_token_hours <= 0 {
            return Err(anyhow!("JWT_ACCESS_TOKEN_HOURS must be positive"));
        }
        if self.reset_token_minutes <= 0 || self.verify_token_hours <= 0 {
            return Err(anyhow!("token lifetimes must be positive"));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(anyhow!("BCRYPT_COST must be between 4 and 31"));
        }
        if self.unlock_fee < 0 {
            return Err(anyhow!("UNLOCK_FEE cannot be negative"));
        }
        Ok(())
    }

    /// Address the HTTP listener binds to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.access_token_hours, 24);
        assert_eq!(config.default_currency, "NGN");
        assert!(config.cors_allowed_origins.is_empty());
        assert!(config.run_migrations);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
    }

    #[test]
    fn parses_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("JWT_SECRET_KEY", "s3cret"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("UNLOCK_FEE", "250000"),
            ("RUN_MIGRATIONS", "false"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.unlock_fee, 250_000);
        assert!(!config.run_migrations);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("BCRYPT_COST", "2")]).is_err());
        assert!(config_from(&[("UNLOCK_FEE", "-1")]).is_err());
    }
}
