//! Startup configuration, read once from the environment.
//!
//! Mail credentials are only ever taken from configuration; there is no
//! built-in sender address.

use std::env;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_RENEWAL_WINDOW_DAYS: i64 = 7;
const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    /// Well-known provider name (gmail, outlook, ...) or an SMTP relay host
    pub service: String,
    pub account: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: String,
    pub port: u16,
    pub jwt_secret: String,
    pub renewal_window_days: i64,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests never touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = match non_empty("SUBTRACK_DATABASE_URL") {
            Some(path) => {
                log::info!("Using database path from SUBTRACK_DATABASE_URL: {}", path);
                path
            }
            None => {
                log::info!("Using default database path: subtrack.db");
                "subtrack.db".to_string()
            }
        };

        let port = match non_empty("SUBTRACK_PORT") {
            Some(port) => port.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "SUBTRACK_PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let jwt_secret =
            non_empty("SUBTRACK_JWT_SECRET").ok_or(ConfigError::Missing("SUBTRACK_JWT_SECRET"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "SUBTRACK_JWT_SECRET",
                reason: format!("must be at least {} characters", MIN_JWT_SECRET_LEN),
            });
        }

        let renewal_window_days = match non_empty("SUBTRACK_RENEWAL_WINDOW_DAYS") {
            Some(days) => {
                let days = days.parse::<i64>().map_err(|e| ConfigError::Invalid {
                    name: "SUBTRACK_RENEWAL_WINDOW_DAYS",
                    reason: e.to_string(),
                })?;
                if !(1..=365).contains(&days) {
                    return Err(ConfigError::Invalid {
                        name: "SUBTRACK_RENEWAL_WINDOW_DAYS",
                        reason: "must be between 1 and 365".to_string(),
                    });
                }
                days
            }
            None => DEFAULT_RENEWAL_WINDOW_DAYS,
        };

        let mail = MailConfig {
            service: non_empty("MAIL_SERVICE").ok_or(ConfigError::Missing("MAIL_SERVICE"))?,
            account: non_empty("MAIL_ACCOUNT").ok_or(ConfigError::Missing("MAIL_ACCOUNT"))?,
            password: lookup("MAIL_PASSWORD").ok_or(ConfigError::Missing("MAIL_PASSWORD"))?,
        };

        if crate::security::validation::validate_email(&mail.account).is_err() {
            return Err(ConfigError::Invalid {
                name: "MAIL_ACCOUNT",
                reason: "not a valid email address".to_string(),
            });
        }

        Ok(AppConfig {
            db_path,
            port,
            jwt_secret,
            renewal_window_days,
            mail,
        })
    }
}
