//! Centralized configuration (environment variables + defaults).

use crate::domain::auth::password::DEFAULT_BCRYPT_COST;
use anyhow::{bail, Context};
use std::str::FromStr;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_ACCESS_EXPIRATION_MINUTES: i64 = 100;
pub const DEFAULT_REFRESH_EXPIRATION_MINUTES: i64 = 1440;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Administrator account created at startup when both credentials are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub access_expiration_minutes: i64,
    pub refresh_expiration_minutes: i64,
    pub bcrypt_cost: u32,
    pub db_max_connections: u32,
    pub admin: Option<AdminSeed>,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenv` first to pick up a `.env` file.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET must be set")?;

        let access_expiration_minutes = parse_or(
            &get,
            "JWT_ACCESS_EXPIRATION_MINUTES",
            DEFAULT_ACCESS_EXPIRATION_MINUTES,
        )?;
        let refresh_expiration_minutes = parse_or(
            &get,
            "JWT_REFRESH_EXPIRATION_MINUTES",
            DEFAULT_REFRESH_EXPIRATION_MINUTES,
        )?;
        if access_expiration_minutes <= 0 || refresh_expiration_minutes <= 0 {
            bail!("token expiration minutes must be positive");
        }

        let bcrypt_cost = parse_or(&get, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31, got {}", bcrypt_cost);
        }

        let db_max_connections =
            parse_or(&get, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?.max(1);

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            _ => bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            database_url: get("DATABASE_URL"),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret,
            access_expiration_minutes,
            refresh_expiration_minutes,
            bcrypt_cost,
            db_max_connections,
            admin,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}
