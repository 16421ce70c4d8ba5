//! Runtime Configuration
//!
//! Read once at startup from the process environment (after `.env` has been
//! loaded). A missing `JWT_SECRET` or an unparsable number aborts startup.

use crate::auth::{hasher::DEFAULT_HASH_COST, AuthGuardMode};
use crate::middleware::RateLimitConfig;
use anyhow::{bail, Context, Result};
use lettre::Address;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_DATABASE_PATH: &str = "timewarp.db";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3001,https://time-warp-rxs7.vercel.app";
pub const DEFAULT_EMAIL_PORT: u16 = 587;

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub database_path: PathBuf,
    pub rate_limit: RateLimitConfig,
    pub auth_mode: AuthGuardMode,
    pub bcrypt_cost: u32,
    pub mail: Option<MailConfig>,
    pub admin_email: Option<Address>,
}

#[derive(Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => bail!("JWT_SECRET must be set to a non-empty value"),
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max_requests: parse_or(&get, "RATE_LIMIT_MAX_REQUESTS", defaults.max_requests)?,
            window: Duration::from_secs(parse_or(
                &get,
                "RATE_LIMIT_WINDOW_SECS",
                defaults.window.as_secs(),
            )?),
        };
        if rate_limit.max_requests == 0 || rate_limit.window.is_zero() {
            bail!("RATE_LIMIT_MAX_REQUESTS and RATE_LIMIT_WINDOW_SECS must be positive");
        }

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect::<Vec<_>>();
        if cors_origins.iter().any(|o| o == "*") {
            bail!("CORS_ORIGINS cannot contain '*' because credentials are allowed");
        }

        let bcrypt_cost = parse_or(&get, "BCRYPT_COST", DEFAULT_HASH_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31, got {bcrypt_cost}");
        }

        let mail = match get("EMAIL_HOST") {
            Some(host) => {
                let username = get("EMAIL_USER");
                let from = get("EMAIL_FROM")
                    .or_else(|| username.clone())
                    .context("EMAIL_FROM or EMAIL_USER is required when EMAIL_HOST is set")?;
                Some(MailConfig {
                    host,
                    port: parse_or(&get, "EMAIL_PORT", DEFAULT_EMAIL_PORT)?,
                    username,
                    password: get("EMAIL_PASSWORD"),
                    from,
                })
            }
            None => None,
        };

        let admin_email = get("ADMIN_EMAIL")
            .map(|raw| {
                raw.parse::<Address>()
                    .with_context(|| format!("ADMIN_EMAIL is not a valid address: {raw}"))
            })
            .transpose()?;

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            cors_origins,
            jwt_secret,
            database_path: get("DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
                .into(),
            rate_limit,
            auth_mode: parse_or(&get, "AUTH_VERIFY_TOKENS", AuthGuardMode::default())?,
            bcrypt_cost,
            mail,
            admin_email,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}='{raw}': {e}")),
        None => Ok(default),
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_origins", &self.cors_origins)
            .field("jwt_secret", &"[redacted]")
            .field("database_path", &self.database_path)
            .field("rate_limit", &self.rate_limit)
            .field("auth_mode", &self.auth_mode)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("mail", &self.mail)
            .field("admin_email", &self.admin_email)
            .finish()
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("from", &self.from)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.database_path, PathBuf::from("timewarp.db"));
        assert_eq!(cfg.rate_limit.max_requests, 100);
        assert_eq!(cfg.rate_limit.window, Duration::from_secs(60));
        assert_eq!(cfg.auth_mode, AuthGuardMode::Presence);
        assert_eq!(cfg.bcrypt_cost, 10);
        assert_eq!(
            cfg.cors_origins,
            vec!["http://localhost:3001", "https://time-warp-rxs7.vercel.app"]
        );
        assert!(cfg.mail.is_none());
        assert!(cfg.admin_email.is_none());
    }

    #[test]
    fn test_missing_secret_fails() {
        assert!(config(&[]).is_err());
        assert!(config(&[("JWT_SECRET", "   ")]).is_err());
    }

    #[test]
    fn test_wildcard_cors_rejected() {
        let err = config(&[("JWT_SECRET", "s"), ("CORS_ORIGINS", "*")]).unwrap_err();
        assert!(err.to_string().contains("CORS_ORIGINS"));
        assert!(config(&[
            ("JWT_SECRET", "s"),
            ("CORS_ORIGINS", "http://localhost:3001, *")
        ])
        .is_err());

        let cfg = config(&[("JWT_SECRET", "s"), ("CORS_ORIGINS", "https://a.example, ")]).unwrap();
        assert_eq!(cfg.cors_origins, vec!["https://a.example"]);
    }

    #[test]
    fn test_invalid_number_fails() {
        let err = config(&[("JWT_SECRET", "s"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert!(config(&[("JWT_SECRET", "s"), ("RATE_LIMIT_MAX_REQUESTS", "0")]).is_err());
    }

    #[test]
    fn test_mail_settings() {
        let cfg = config(&[
            ("JWT_SECRET", "s"),
            ("EMAIL_HOST", "smtp.example.com"),
            ("EMAIL_USER", "bot@example.com"),
            ("EMAIL_PASSWORD", "hunter2"),
            ("ADMIN_EMAIL", "admin@example.com"),
            ("AUTH_VERIFY_TOKENS", "verify"),
        ])
        .unwrap();
        let mail = cfg.mail.as_ref().unwrap();
        assert_eq!(mail.port, 587);
        assert_eq!(mail.from, "bot@example.com");
        assert_eq!(cfg.auth_mode, AuthGuardMode::Verify);

        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("\"s\""));

        assert!(config(&[("JWT_SECRET", "s"), ("EMAIL_HOST", "smtp.example.com")]).is_err());
        assert!(config(&[("JWT_SECRET", "s"), ("ADMIN_EMAIL", "nope")]).is_err());
    }
}
