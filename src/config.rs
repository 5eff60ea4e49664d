use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    /// Key accepted for read-only (GET) requests.
    pub api_key: String,
    /// Key accepted for every request, including writes.
    pub admin_api_key: String,
    /// Upper bound for time-frame queries, in days.
    pub max_time_frame_days: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = required("X_API_KEY")?;
        let admin_api_key = required("X_API_KEY_ADMIN")?;
        check_api_keys(&api_key, &admin_api_key)?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: optional("DB_MAX_CONNECTIONS", "10")
                .parse()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            api_key,
            admin_api_key,
            max_time_frame_days: parse_max_time_frame_days(&optional("MAX_TIME_FRAME_DAYS", "7"))?,
        })
    }
}

/// Parse `MAX_TIME_FRAME_DAYS`. Zero is rejected; a window that can never
/// contain anything is a misconfiguration.
fn parse_max_time_frame_days(raw: &str) -> Result<u32> {
    let days: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("MAX_TIME_FRAME_DAYS must be a positive integer, got: {raw:?}"))?;
    if days == 0 {
        bail!("MAX_TIME_FRAME_DAYS must be a positive integer, got: 0");
    }
    Ok(days)
}

fn check_api_keys(api_key: &str, admin_api_key: &str) -> Result<()> {
    if api_key.is_empty() || admin_api_key.is_empty() {
        bail!("X_API_KEY and X_API_KEY_ADMIN must not be empty");
    }
    if api_key == admin_api_key {
        bail!("X_API_KEY and X_API_KEY_ADMIN must differ");
    }
    Ok(())
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
