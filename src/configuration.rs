use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::warn;

const INSECURE_DEBUG_KEY: &str = "securelog-insecure-debug-key";
const DEFAULT_DATABASE_URL: &str = "sqlite://securelog.db?mode=rwc";

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub db_max_connections: u32,
    pub debug: bool,
    pub secret_key: String,
    pub host: String,
    pub port: u16,
    pub media_root: PathBuf,
    pub max_upload_bytes: usize,
    pub serve_static: bool,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub admin: Option<AdminBootstrap>,
}

/// Credentials for the staff account created at startup when it is missing.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl Settings {
    /// Reads settings from the process environment. Call `dotenv().ok()` first
    /// to pick up a local `.env` file.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = parse_bool(lookup("DEBUG").as_deref()).context("DEBUG")?;

        let secret_key = match lookup("SECRET_KEY").filter(|s| !s.trim().is_empty()) {
            Some(key) => key,
            None if debug => {
                warn!("SECRET_KEY not set, using the insecure debug key");
                INSECURE_DEBUG_KEY.to_string()
            }
            None => bail!("SECRET_KEY must be set when DEBUG is off"),
        };

        let admin = match (lookup("ADMIN_USERNAME"), lookup("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminBootstrap {
                email: lookup("ADMIN_EMAIL").unwrap_or_default(),
                username,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            db_max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), 10).context("DB_MAX_CONNECTIONS")?,
            debug,
            secret_key,
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(lookup("PORT"), 8080).context("PORT")?,
            media_root: PathBuf::from(lookup("MEDIA_ROOT").unwrap_or_else(|| "media".to_string())),
            max_upload_bytes: parse_or(lookup("MAX_UPLOAD_BYTES"), 10 * 1024 * 1024).context("MAX_UPLOAD_BYTES")?,
            serve_static: match lookup("SERVE_STATIC") {
                Some(v) => parse_bool(Some(&v)).context("SERVE_STATIC")?,
                None => true,
            },
            session_ttl_hours: parse_or(lookup("SESSION_TTL_HOURS"), 12).context("SESSION_TTL_HOURS")?,
            bcrypt_cost: parse_or(lookup("BCRYPT_COST"), bcrypt::DEFAULT_COST).context("BCRYPT_COST")?,
            admin,
        })
    }

    pub fn is_sqlite(&self) -> bool {
        self.database_url.starts_with("sqlite:")
    }
}

fn parse_bool(value: Option<&str>) -> anyhow::Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => bail!("invalid boolean value: {other}"),
        },
    }
}

fn parse_or<T>(value: Option<String>, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => Ok(v.trim().parse::<T>()?),
        None => Ok(default),
    }
}
