use std::{net::SocketAddr, time::Duration};

use anyhow::{anyhow, Context};
use income_clarity_core::import::{ImportConfig, WarningPolicy};

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub import: ImportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(30000),
            import: ImportConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr: SocketAddr = match std::env::var("IC_LISTEN_ADDR") {
            Ok(addr) => addr.parse().context("Invalid IC_LISTEN_ADDR")?,
            Err(_) => defaults.listen_addr,
        };
        let cors_allow = std::env::var("IC_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = std::env::var("IC_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".into())
            .parse()
            .unwrap_or(30000);

        let max_rows = match std::env::var("IC_IMPORT_MAX_ROWS") {
            Ok(v) => v.trim().parse().context("Invalid IC_IMPORT_MAX_ROWS")?,
            Err(_) => defaults.import.max_rows,
        };
        let max_bytes = match std::env::var("IC_IMPORT_MAX_BYTES") {
            Ok(v) => v.trim().parse().context("Invalid IC_IMPORT_MAX_BYTES")?,
            Err(_) => defaults.import.max_bytes,
        };
        let warning_policy = match std::env::var("IC_IMPORT_WARNING_POLICY") {
            Ok(v) => v
                .parse::<WarningPolicy>()
                .map_err(|e| anyhow!("Invalid IC_IMPORT_WARNING_POLICY: {}", e))?,
            Err(_) => defaults.import.warning_policy,
        };

        Ok(Self {
            listen_addr,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            import: ImportConfig {
                max_rows,
                max_bytes,
                warning_policy,
            },
        })
    }
}
