//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::str::FromStr;

/// Signing secret used when `JWT_SECRET` is unset. Fine for local runs only.
pub const DEV_JWT_SECRET: &str = "rxpos-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Bootstrap super-admin, created at startup when both are set
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    /// Super-admins allowed to act for a tenant. Empty allows every
    /// super-admin.
    pub impersonation_allowlist: Vec<String>,

    /// Whether a refunded CREDIT sale takes its outstanding amount back off
    /// the customer's balance.
    pub refund_reverses_credit: bool,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ApiConfig {
            http_port: parse_var("HTTP_PORT", 8080)?,

            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "./rxpos.db".to_string()),

            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),

            jwt_access_lifetime_secs: parse_var("JWT_ACCESS_LIFETIME_SECS", 3600)?,

            admin_username: non_empty_var("ADMIN_USERNAME"),

            admin_password: non_empty_var("ADMIN_PASSWORD"),

            impersonation_allowlist: env::var("IMPERSONATION_ALLOWLIST")
                .map(|list| parse_list(&list))
                .unwrap_or_default(),

            refund_reverses_credit: parse_var("REFUND_REVERSES_CREDIT", false)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_username.is_some() != self.admin_password.is_some() {
            return Err(ConfigError::MissingRequired(
                "ADMIN_USERNAME and ADMIN_PASSWORD must be set together".to_string(),
            ));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if self.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()));
        }
        Ok(())
    }

    /// Whether `username` may act for a tenant.
    pub fn may_impersonate(&self, username: &str) -> bool {
        self.impersonation_allowlist.is_empty()
            || self.impersonation_allowlist.iter().any(|allowed| allowed == username)
    }

    /// Whether the signing secret is still the built-in development one.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            http_port: 8080,
            database_path: "./rxpos.db".to_string(),
            db_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_access_lifetime_secs: 3600,
            admin_username: None,
            admin_password: None,
            impersonation_allowlist: Vec::new(),
            refund_reverses_credit: false,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" root, ops ,,"), vec!["root", "ops"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_impersonation_allowlist() {
        let mut config = ApiConfig::default();
        assert!(config.may_impersonate("anyone"));

        config.impersonation_allowlist = vec!["root".to_string()];
        assert!(config.may_impersonate("root"));
        assert!(!config.may_impersonate("ops"));
    }

    #[test]
    fn test_admin_pair_required_together() {
        let config = ApiConfig {
            admin_username: Some("root".to_string()),
            ..ApiConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MissingRequired(_))));
    }
}
