use std::env;
use std::time::Duration;

use chrono::FixedOffset;

use crate::utils::AppError;

/// Configuração do serviço, lida do ambiente (`.env` via dotenv).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: Option<String>,
    pub poll_interval: Duration,
    pub stale_after_secs: i64,
    pub display_offset: FixedOffset,
    pub query_retry: u32,
    pub cookie_secure: bool,
    pub allowed_origins: Vec<String>,
}

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_STALE_AFTER_SECS: i64 = 30;
// WIB (UTC+7)
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 420;
const DEFAULT_QUERY_RETRY: u32 = 3;

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing backend credentials
    /// are fatal; everything else falls back to a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, AppError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Config(format!("{} is required", key)))
        };

        let supabase_url = required("SUPABASE_URL")?.trim_end_matches('/').to_string();
        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("PORT is not a valid port: {}", raw)))?,
            None => 3002,
        };

        let poll_secs: u64 = lookup("DISPLAY_POLL_INTERVAL_SECS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
            .max(1);

        let stale_after_secs = lookup("DISPLAY_STALE_AFTER_SECS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_STALE_AFTER_SECS);

        let offset_minutes: i32 = lookup("DISPLAY_UTC_OFFSET_MINUTES")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES);
        let display_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            AppError::Config(format!("DISPLAY_UTC_OFFSET_MINUTES out of range: {}", offset_minutes))
        })?;

        let query_retry = lookup("QUERY_RETRY")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_QUERY_RETRY);

        let cookie_secure = lookup("COOKIE_SECURE")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            supabase_url,
            supabase_anon_key,
            supabase_jwt_secret: lookup("SUPABASE_JWT_SECRET").filter(|s| !s.trim().is_empty()),
            poll_interval: Duration::from_secs(poll_secs),
            stale_after_secs,
            display_offset,
            query_retry,
            cookie_secure,
            allowed_origins,
        })
    }
}
