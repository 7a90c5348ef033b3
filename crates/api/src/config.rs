//! Process configuration read from the environment.
//!
//! | variable | default |
//! |---|---|
//! | `JWT_SECRET` | insecure dev secret (logged as a warning) |
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `DATABASE_URL` | unset: in-memory store |
//! | `TOKEN_TTL_HOURS` | `24` (at most one year) |
//! | `BOOTSTRAP_ADMIN_USERNAME` / `BOOTSTRAP_ADMIN_PASSWORD` | unset: no admin |
//!
//! Empty values count as unset.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use registrar_auth::DEFAULT_TOKEN_TTL_HOURS;
use registrar_infra::AdminSeed;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("BOOTSTRAP_ADMIN_USERNAME and BOOTSTRAP_ADMIN_PASSWORD must be set together")]
    PartialAdmin,
}

#[derive(Clone)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    /// Postgres connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub token_ttl: Duration,
    pub bootstrap_admin: Option<AdminSeed>,
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database", &self.database_url.as_ref().map(|_| "postgres"))
            .field("token_ttl", &self.token_ttl)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .trim()
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let token_ttl = match get("TOKEN_TTL_HOURS") {
            Some(raw) => {
                let hours: i64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid {
                        var: "TOKEN_TTL_HOURS",
                        reason: e.to_string(),
                    }
                })?;
                if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
                    return Err(ConfigError::Invalid {
                        var: "TOKEN_TTL_HOURS",
                        reason: format!("must be between 1 and {MAX_TOKEN_TTL_HOURS} hours"),
                    });
                }
                Duration::hours(hours)
            }
            None => Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        };

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_USERNAME"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminSeed { username, password }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialAdmin),
        };

        Ok(Self {
            jwt_secret,
            bind_addr,
            database_url: get("DATABASE_URL"),
            token_ttl,
            bootstrap_admin,
        })
    }

    /// In-memory configuration with an explicit secret (tests, local runs).
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: None,
            token_ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
            bootstrap_admin: None,
        }
    }

    pub fn with_bootstrap_admin(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.bootstrap_admin = Some(AdminSeed {
            username: username.into(),
            password: password.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.token_ttl, Duration::hours(24));
        assert!(cfg.database_url.is_none());
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn values_are_read_from_the_lookup() {
        let cfg = config(&[
            ("JWT_SECRET", "s3cret"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("TOKEN_TTL_HOURS", "2"),
            ("DATABASE_URL", "postgres://localhost/registrar"),
            ("BOOTSTRAP_ADMIN_USERNAME", "admin"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "password123"),
        ])
        .unwrap();
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.token_ttl, Duration::hours(2));
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/registrar"));
        assert_eq!(cfg.bootstrap_admin.unwrap().username, "admin");
    }

    #[test]
    fn empty_values_count_as_unset() {
        let cfg = config(&[("JWT_SECRET", ""), ("DATABASE_URL", "  ")]).unwrap();
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            config(&[("BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { var: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            config(&[("TOKEN_TTL_HOURS", "0")]),
            Err(ConfigError::Invalid { var: "TOKEN_TTL_HOURS", .. })
        ));
        assert_eq!(
            config(&[("TOKEN_TTL_HOURS", "8760")]).unwrap().token_ttl,
            Duration::hours(MAX_TOKEN_TTL_HOURS)
        );
        for too_long in ["8761", "100000000000", "9223372036854775807"] {
            assert!(matches!(
                config(&[("TOKEN_TTL_HOURS", too_long)]),
                Err(ConfigError::Invalid { var: "TOKEN_TTL_HOURS", .. })
            ));
        }
        assert_eq!(
            config(&[("BOOTSTRAP_ADMIN_USERNAME", "admin")]).unwrap_err(),
            ConfigError::PartialAdmin
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = config(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://user:pw@localhost/db"),
        ])
        .unwrap();
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("s3cret"));
        assert!(!shown.contains("pw@"));
    }
}
