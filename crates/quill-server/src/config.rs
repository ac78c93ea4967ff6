use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "your_jwt_secret_key",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

const DEFAULT_BODY_LIMIT_MB: usize = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("QUILL_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("QUILL_JWT_SECRET is unset or still a placeholder");
        }

        let db_path = lookup("QUILL_DB_PATH").unwrap_or_else(|| "quill.db".into()).into();
        let host = lookup("QUILL_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("QUILL_PORT")
            .unwrap_or_else(|| "8081".into())
            .parse()
            .context("QUILL_PORT is not a valid port")?;
        let body_limit_mb: usize = match lookup("QUILL_BODY_LIMIT_MB") {
            Some(raw) => raw.parse().context("QUILL_BODY_LIMIT_MB is not a number")?,
            None => DEFAULT_BODY_LIMIT_MB,
        };
        let body_limit_bytes = body_limit_mb
            .checked_mul(1024 * 1024)
            .context("QUILL_BODY_LIMIT_MB is too large")?;

        Ok(Self {
            jwt_secret,
            db_path,
            host,
            port,
            body_limit_bytes,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = config(&[("QUILL_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("quill.db"));
        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.body_limit_bytes, 50 * 1024 * 1024);
        assert_eq!(cfg.addr().unwrap().to_string(), "0.0.0.0:8081");
    }

    #[test]
    fn secret_is_required() {
        assert!(config(&[]).is_err());
        assert!(config(&[("QUILL_JWT_SECRET", "")]).is_err());
        assert!(config(&[("QUILL_JWT_SECRET", "your_jwt_secret_key")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config(&[
            ("QUILL_JWT_SECRET", "s3cret"),
            ("QUILL_DB_PATH", "/tmp/q.db"),
            ("QUILL_HOST", "127.0.0.1"),
            ("QUILL_PORT", "9000"),
            ("QUILL_BODY_LIMIT_MB", "2"),
        ])
        .unwrap();
        assert_eq!(cfg.addr().unwrap().to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/q.db"));
        assert_eq!(cfg.body_limit_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn oversized_body_limit_is_an_error() {
        let max = usize::MAX.to_string();
        let err =
            config(&[("QUILL_JWT_SECRET", "s3cret"), ("QUILL_BODY_LIMIT_MB", &max)]).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(config(&[("QUILL_JWT_SECRET", "s3cret"), ("QUILL_PORT", "http")]).is_err());
    }
}
