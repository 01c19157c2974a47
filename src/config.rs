use std::env;
use std::fmt;
use std::str::FromStr;

use crate::db::schema::MAX_PAGE_SIZE;

/// Credential string that never shows up in logs.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Fauna,
    Memory,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fauna" => Ok(Backend::Fauna),
            "memory" => Ok(Backend::Memory),
            other => Err(anyhow::anyhow!(
                "Invalid DATABASE_BACKEND `{}` (expected `fauna` or `memory`)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub fauna_secret: Option<Secret>,
    pub fauna_endpoint: String,
    pub fauna_timeout_secs: u64,
    pub host: String,
    pub port: u16,
    pub page_size: u32,
    /// Allowed cross-origin caller; `None` disables CORS handling.
    pub cors_origin: Option<String>,
}

pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend: Backend = env::var("DATABASE_BACKEND")
            .unwrap_or_else(|_| "fauna".into())
            .parse()?;

        let fauna_secret = match backend {
            Backend::Fauna => Some(Secret::new(required("FAUNA_SECRET")?)),
            Backend::Memory => env::var("FAUNA_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .map(Secret::new),
        };

        let page_size: u32 = env::var("PAGE_SIZE")
            .unwrap_or_else(|_| MAX_PAGE_SIZE.to_string())
            .parse()?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            anyhow::bail!("PAGE_SIZE must be between 1 and {}", MAX_PAGE_SIZE);
        }

        Ok(Self {
            backend,
            fauna_secret,
            fauna_endpoint: env::var("FAUNA_ENDPOINT")
                .unwrap_or_else(|_| "https://db.fauna.com".into()),
            fauna_timeout_secs: env::var("FAUNA_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8787".into())
                .parse()?,
            page_size,
            // Unset keeps the default origin, an empty value turns CORS off.
            cors_origin: match env::var("CORS_ORIGIN") {
                Ok(origin) if origin.is_empty() => None,
                Ok(origin) => Some(origin),
                Err(_) => Some(DEFAULT_CORS_ORIGIN.into()),
            },
        })
    }
}

impl Default for Config {
    /// Local development settings backed by the in-memory store.
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            fauna_secret: None,
            fauna_endpoint: "https://db.fauna.com".into(),
            fauna_timeout_secs: 30,
            host: "127.0.0.1".into(),
            port: 8787,
            page_size: MAX_PAGE_SIZE,
            cors_origin: Some(DEFAULT_CORS_ORIGIN.into()),
        }
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing required env var: {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_redacted_in_debug_output() {
        let config = Config {
            fauna_secret: Some(Secret::new("fnAE-very-secret")),
            ..Config::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("fnAE-very-secret"));
        assert!(printed.contains("Secret(***)"));
    }

    #[test]
    fn backend_names() {
        assert_eq!("Memory".parse::<Backend>().unwrap(), Backend::Memory);
        assert_eq!("fauna".parse::<Backend>().unwrap(), Backend::Fauna);
        assert!("postgres".parse::<Backend>().is_err());
    }
}
