// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into a
//! [`ServerConfig`]. Every setting has a hardcoded fallback so the server can
//! start with zero configuration for local development.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory of the document store | `./data` |
//! | `APP_ENV` | `development` or `production` | `development` |
//! | `JWT_SECRET` | HS256 signing secret for session tokens | dev-only secret |
//! | `JWT_EXPIRY_HOURS` | Session token lifetime | `24` |
//! | `DEFAULT_PAGE_SIZE` | Page size when `limit` is absent | `10` |
//! | `MAX_PAGE_SIZE` | Upper bound for `limit` | `100` |
//! | `MAX_UPLOAD_BYTES` | Maximum accepted upload size | `5242880` |
//! | `ALLOWED_UPLOAD_TYPES` | Comma-separated MIME allowlist | images + pdf |
//! | `CORS_ORIGINS` | Comma-separated origin allowlist (`*` = any) | `http://localhost:3000` |
//! | `RATE_LIMIT_WINDOW_SECS` | Rate-limit window length | `900` |
//! | `RATE_LIMIT_MAX_REQUESTS` | Requests per client per window | `100` |
//! | `UPLOAD_REMOTE_URL` | Object-storage base URL (enables remote uploads) | unset |
//! | `UPLOAD_REMOTE_TOKEN` | Bearer token for the object store | unset |
//! | `UPLOAD_PUBLIC_BASE_URL` | Public URL prefix for stored files | empty |
//! | `SEED_SUPERADMIN_EMAIL` | Existing account promoted to superadmin at boot | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const APP_ENV_ENV: &str = "APP_ENV";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRY_HOURS_ENV: &str = "JWT_EXPIRY_HOURS";
pub const DEFAULT_PAGE_SIZE_ENV: &str = "DEFAULT_PAGE_SIZE";
pub const MAX_PAGE_SIZE_ENV: &str = "MAX_PAGE_SIZE";
pub const MAX_UPLOAD_BYTES_ENV: &str = "MAX_UPLOAD_BYTES";
pub const ALLOWED_UPLOAD_TYPES_ENV: &str = "ALLOWED_UPLOAD_TYPES";
pub const CORS_ORIGINS_ENV: &str = "CORS_ORIGINS";
pub const RATE_LIMIT_WINDOW_SECS_ENV: &str = "RATE_LIMIT_WINDOW_SECS";
pub const RATE_LIMIT_MAX_REQUESTS_ENV: &str = "RATE_LIMIT_MAX_REQUESTS";
pub const UPLOAD_REMOTE_URL_ENV: &str = "UPLOAD_REMOTE_URL";
pub const UPLOAD_REMOTE_TOKEN_ENV: &str = "UPLOAD_REMOTE_TOKEN";
pub const UPLOAD_PUBLIC_BASE_URL_ENV: &str = "UPLOAD_PUBLIC_BASE_URL";
pub const SEED_SUPERADMIN_EMAIL_ENV: &str = "SEED_SUPERADMIN_EMAIL";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Signing secret used when `JWT_SECRET` is unset. Never valid in production.
pub const DEV_JWT_SECRET: &str = "healthclub-dev-secret-change-me";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" | "test" => Ok(Environment::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root of the JSON document store.
    pub data_dir: PathBuf,
    pub environment: Environment,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub max_upload_bytes: usize,
    pub allowed_upload_types: Vec<String>,
    /// Allowed CORS origins. A single `*` entry allows any origin.
    pub cors_origins: Vec<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_requests: u32,
    /// When set, uploads go to the remote object store instead of local disk.
    pub upload_remote_url: Option<String>,
    pub upload_remote_token: Option<String>,
    pub upload_public_base_url: String,
    pub seed_superadmin_email: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            environment: Environment::Development,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiry_hours: 24,
            default_page_size: 10,
            max_page_size: 100,
            max_upload_bytes: 5 * 1024 * 1024, // 5 MiB
            allowed_upload_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
                "application/pdf".to_string(),
            ],
            cors_origins: vec!["http://localhost:3000".to_string()],
            rate_limit_window_secs: 15 * 60,
            rate_limit_max_requests: 100,
            upload_remote_url: None,
            upload_remote_token: None,
            upload_public_base_url: String::new(),
            seed_superadmin_email: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var(HOST_ENV) {
            config.host = host;
        }
        if let Some(port) = env_parse(PORT_ENV) {
            config.port = port;
        }
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(environment) = env_parse(APP_ENV_ENV) {
            config.environment = environment;
        }

        match std::env::var(JWT_SECRET_ENV) {
            Ok(secret) if !secret.is_empty() => config.jwt_secret = secret,
            _ => {
                if config.environment == Environment::Production {
                    tracing::error!("JWT_SECRET is not set; refusing to use the development secret");
                } else {
                    tracing::warn!("JWT_SECRET is not set, using the development secret");
                }
            }
        }

        if let Some(hours) = env_parse::<i64>(JWT_EXPIRY_HOURS_ENV) {
            if hours > 0 {
                config.jwt_expiry_hours = hours;
            }
        }
        if let Some(size) = env_parse::<usize>(DEFAULT_PAGE_SIZE_ENV) {
            config.default_page_size = size.max(1);
        }
        if let Some(size) = env_parse::<usize>(MAX_PAGE_SIZE_ENV) {
            config.max_page_size = size.max(1);
        }
        config.default_page_size = config.default_page_size.min(config.max_page_size);

        if let Some(bytes) = env_parse(MAX_UPLOAD_BYTES_ENV) {
            config.max_upload_bytes = bytes;
        }
        if let Ok(types) = std::env::var(ALLOWED_UPLOAD_TYPES_ENV) {
            config.allowed_upload_types = split_list(&types);
        }
        if let Ok(origins) = std::env::var(CORS_ORIGINS_ENV) {
            config.cors_origins = split_list(&origins);
        }
        if let Some(secs) = env_parse::<u64>(RATE_LIMIT_WINDOW_SECS_ENV) {
            config.rate_limit_window_secs = secs.max(1);
        }
        if let Some(max) = env_parse(RATE_LIMIT_MAX_REQUESTS_ENV) {
            config.rate_limit_max_requests = max;
        }

        config.upload_remote_url = non_empty_env(UPLOAD_REMOTE_URL_ENV);
        config.upload_remote_token = non_empty_env(UPLOAD_REMOTE_TOKEN_ENV);
        if let Some(base) = non_empty_env(UPLOAD_PUBLIC_BASE_URL_ENV) {
            config.upload_public_base_url = base.trim_end_matches('/').to_string();
        }
        config.seed_superadmin_email = non_empty_env(SEED_SUPERADMIN_EMAIL_ENV);

        config
    }

    /// Socket address to bind the HTTP server to.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Whether the production configuration is unsafe to start with.
    pub fn uses_dev_secret_in_production(&self) -> bool {
        self.is_production() && self.jwt_secret == DEV_JWT_SECRET
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Invalid value, using default");
            None
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_for_development() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.max_page_size, 100);
        assert!(!config.is_production());
        assert!(config.upload_remote_url.is_none());
        assert!(config.bind_addr().is_ok());
    }

    #[test]
    fn environment_parses_aliases() {
        assert_eq!("PRODUCTION".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("dev".parse::<Environment>(), Ok(Environment::Development));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn split_list_trims_and_drops_empty_entries() {
        assert_eq!(
            split_list(" image/png, ,application/pdf "),
            vec!["image/png".to_string(), "application/pdf".to_string()]
        );
    }

    #[test]
    fn dev_secret_is_flagged_in_production() {
        let config = ServerConfig {
            environment: Environment::Production,
            ..ServerConfig::default()
        };
        assert!(config.uses_dev_secret_in_production());
    }
}
