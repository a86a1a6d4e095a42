// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and is
//! read-only afterwards. Route groups, the auth middleware and the signature
//! policy capture it by value (behind an `Arc`) when the router is built.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3003` |
//! | `SPVW_ADMIN_KEY` | xPub granting admin authority | Required |
//! | `SPVW_REQUIRE_SIGNING` | Require signed requests from every caller | `false` |
//! | `SPVW_SIGNING_DISABLED` | Skip mandatory signing for admin / required signing | `false` |
//! | `SPVW_SIGNATURE_TTL_SECS` | Max age of a request signature (1..=300) | `20` |
//! | `SPVW_CALLBACK_TOKEN` | Bearer token for transaction callbacks | unset |
//! | `SPVW_CALLBACK_PATH` | Path of the transaction callback endpoint | `/transaction/broadcast/callback` |
//! | `SPVW_API_VERSION` | Version segment of the `/api/<version>` group | `v1` |
//! | `SPVW_OLD_API_VERSION` | Prefix of the legacy `/<version>` group | `v1` |
//! | `SPVW_NEW_TRANSACTION_FLOW` | Enable public-key auth and the `/api/v2` group | `false` |
//! | `SPVW_MAX_BODY_BYTES` | Max body buffered for signature checks | `1048576` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const ADMIN_KEY_ENV: &str = "SPVW_ADMIN_KEY";
pub const REQUIRE_SIGNING_ENV: &str = "SPVW_REQUIRE_SIGNING";
pub const SIGNING_DISABLED_ENV: &str = "SPVW_SIGNING_DISABLED";
pub const SIGNATURE_TTL_ENV: &str = "SPVW_SIGNATURE_TTL_SECS";
pub const CALLBACK_TOKEN_ENV: &str = "SPVW_CALLBACK_TOKEN";
pub const CALLBACK_PATH_ENV: &str = "SPVW_CALLBACK_PATH";
pub const API_VERSION_ENV: &str = "SPVW_API_VERSION";
pub const OLD_API_VERSION_ENV: &str = "SPVW_OLD_API_VERSION";
pub const NEW_TRANSACTION_FLOW_ENV: &str = "SPVW_NEW_TRANSACTION_FLOW";
pub const MAX_BODY_BYTES_ENV: &str = "SPVW_MAX_BODY_BYTES";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default signature time-to-live.
pub const DEFAULT_SIGNATURE_TTL: Duration = Duration::from_secs(20);

/// Upper bound accepted for `SPVW_SIGNATURE_TTL_SECS`.
pub const MAX_SIGNATURE_TTL: Duration = Duration::from_secs(300);

pub const DEFAULT_CALLBACK_PATH: &str = "/transaction/broadcast/callback";

pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Version segment of the group mounted by the new transaction flow.
pub const V2_API_VERSION: &str = "v2";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub admin_key: String,
    pub require_signing: bool,
    pub signing_disabled: bool,
    pub signature_ttl: Duration,
    pub callback_token: Option<String>,
    pub callback_path: String,
    pub api_version: String,
    pub old_api_version: String,
    pub new_transaction_flow_enabled: bool,
    pub max_body_bytes: usize,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let kv: HashMap<String, String> = std::env::vars().collect();
        Self::from_kv(&kv)
    }

    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let host = non_empty(kv, HOST_ENV).unwrap_or("0.0.0.0");
        let port = parse_number::<u16>(kv, PORT_ENV)?.unwrap_or(3003);
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let admin_key = non_empty(kv, ADMIN_KEY_ENV)
            .ok_or(ConfigError::Missing(ADMIN_KEY_ENV))?
            .to_string();

        let signature_ttl = match parse_number::<u64>(kv, SIGNATURE_TTL_ENV)? {
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_SIGNATURE_TTL,
        };
        if signature_ttl.is_zero() || signature_ttl > MAX_SIGNATURE_TTL {
            return Err(ConfigError::Invalid {
                name: SIGNATURE_TTL_ENV,
                reason: format!("must be between 1 and {}", MAX_SIGNATURE_TTL.as_secs()),
            });
        }

        let callback_path = non_empty(kv, CALLBACK_PATH_ENV)
            .unwrap_or(DEFAULT_CALLBACK_PATH)
            .to_string();
        if !callback_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                name: CALLBACK_PATH_ENV,
                reason: "must start with '/'".to_string(),
            });
        }

        let log_format = match non_empty(kv, LOG_FORMAT_ENV) {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("unknown format '{other}'"),
                })
            }
        };

        let api_version = non_empty(kv, API_VERSION_ENV).unwrap_or("v1").to_string();
        let new_transaction_flow_enabled =
            parse_bool(kv, NEW_TRANSACTION_FLOW_ENV)?.unwrap_or(false);
        // The new flow owns `/api/v2`; the versioned group cannot share it.
        if new_transaction_flow_enabled && api_version == V2_API_VERSION {
            return Err(ConfigError::Invalid {
                name: API_VERSION_ENV,
                reason: format!(
                    "'{V2_API_VERSION}' is reserved while {NEW_TRANSACTION_FLOW_ENV} is on"
                ),
            });
        }

        Ok(Self {
            bind_addr,
            admin_key,
            require_signing: parse_bool(kv, REQUIRE_SIGNING_ENV)?.unwrap_or(false),
            signing_disabled: parse_bool(kv, SIGNING_DISABLED_ENV)?.unwrap_or(false),
            signature_ttl,
            callback_token: non_empty(kv, CALLBACK_TOKEN_ENV).map(str::to_string),
            callback_path,
            api_version,
            old_api_version: non_empty(kv, OLD_API_VERSION_ENV).unwrap_or("v1").to_string(),
            new_transaction_flow_enabled,
            max_body_bytes: parse_number::<usize>(kv, MAX_BODY_BYTES_ENV)?
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            log_format,
        })
    }

    /// Configuration with defaults for everything but the admin key.
    pub fn with_admin_key(admin_key: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3003)),
            admin_key: admin_key.into(),
            require_signing: false,
            signing_disabled: false,
            signature_ttl: DEFAULT_SIGNATURE_TTL,
            callback_token: None,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            api_version: "v1".to_string(),
            old_api_version: "v1".to_string(),
            new_transaction_flow_enabled: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log_format: LogFormat::Pretty,
        }
    }
}

fn non_empty<'a>(kv: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    kv.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_bool(kv: &HashMap<String, String>, name: &'static str) -> Result<Option<bool>, ConfigError> {
    match non_empty(kv, name).map(str::to_ascii_lowercase).as_deref() {
        None => Ok(None),
        Some("1" | "true" | "yes" | "on") => Ok(Some(true)),
        Some("0" | "false" | "no" | "off") => Ok(Some(false)),
        Some(other) => Err(ConfigError::Invalid {
            name,
            reason: format!("'{other}' is not a boolean"),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(
    kv: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    non_empty(kv, name)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| ConfigError::Invalid {
                name,
                reason: format!("'{raw}' is not a valid number"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_with_admin_key_only() {
        let config = AppConfig::from_kv(&kv(&[(ADMIN_KEY_ENV, "xpub-admin")])).unwrap();
        assert_eq!(config.admin_key, "xpub-admin");
        assert_eq!(config.bind_addr.port(), 3003);
        assert!(!config.require_signing);
        assert!(!config.signing_disabled);
        assert_eq!(config.signature_ttl, DEFAULT_SIGNATURE_TTL);
        assert_eq!(config.callback_token, None);
        assert_eq!(config.callback_path, DEFAULT_CALLBACK_PATH);
        assert_eq!(config.api_version, "v1");
        assert!(!config.new_transaction_flow_enabled);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn admin_key_is_required() {
        assert_eq!(
            AppConfig::from_kv(&kv(&[])).unwrap_err(),
            ConfigError::Missing(ADMIN_KEY_ENV)
        );
    }

    #[test]
    fn flags_and_numbers_are_parsed() {
        let config = AppConfig::from_kv(&kv(&[
            (ADMIN_KEY_ENV, "xpub-admin"),
            (REQUIRE_SIGNING_ENV, "TRUE"),
            (NEW_TRANSACTION_FLOW_ENV, "1"),
            (SIGNATURE_TTL_ENV, "300"),
            (CALLBACK_TOKEN_ENV, "secret"),
            (PORT_ENV, "8080"),
        ]))
        .unwrap();
        assert!(config.require_signing);
        assert!(config.new_transaction_flow_enabled);
        assert_eq!(config.signature_ttl, Duration::from_secs(300));
        assert_eq!(config.callback_token.as_deref(), Some("secret"));
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = AppConfig::from_kv(&kv(&[
            (ADMIN_KEY_ENV, "xpub-admin"),
            (REQUIRE_SIGNING_ENV, "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: REQUIRE_SIGNING_ENV, .. }));

        let err = AppConfig::from_kv(&kv(&[
            (ADMIN_KEY_ENV, "xpub-admin"),
            (SIGNATURE_TTL_ENV, "3600"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: SIGNATURE_TTL_ENV, .. }));
    }

    #[test]
    fn api_v2_cannot_overlap_the_new_flow_group() {
        let err = AppConfig::from_kv(&kv(&[
            (ADMIN_KEY_ENV, "xpub-admin"),
            (API_VERSION_ENV, "v2"),
            (NEW_TRANSACTION_FLOW_ENV, "true"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: API_VERSION_ENV, .. }));

        let config = AppConfig::from_kv(&kv(&[
            (ADMIN_KEY_ENV, "xpub-admin"),
            (API_VERSION_ENV, "v2"),
        ]))
        .unwrap();
        assert_eq!(config.api_version, "v2");
        assert!(!config.new_transaction_flow_enabled);
    }
}
