use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::pricing::Tariff;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: cannot parse {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("{var} must not be negative")]
    Negative { var: &'static str },
    #[error("both LIDO_TLS_CERT and LIDO_TLS_KEY must be set, or neither")]
    PartialTls,
}

/// Server settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub password: String,
    pub managers: HashSet<String>,
    pub max_connections: usize,
    pub metrics_port: Option<u16>,
    pub tls: Option<TlsPaths>,
    pub tariff: Tariff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: String,
    pub key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let tls = match (lookup("LIDO_TLS_CERT"), lookup("LIDO_TLS_KEY")) {
            (None, None) => None,
            (Some(cert), Some(key)) => Some(TlsPaths { cert, key }),
            _ => return Err(ConfigError::PartialTls),
        };

        let defaults = Tariff::default();
        let tariff = Tariff::new(
            non_negative(
                "LIDO_BASE_PRICE",
                parse_or(&lookup, "LIDO_BASE_PRICE", defaults.base)?,
            )?,
            non_negative(
                "LIDO_PRICE_PER_SEAT_DAY",
                parse_or(&lookup, "LIDO_PRICE_PER_SEAT_DAY", defaults.per_seat_day)?,
            )?,
        );

        let managers = lookup("LIDO_MANAGERS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind: lookup("LIDO_BIND").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "LIDO_PORT", 5433)?,
            password: lookup("LIDO_PASSWORD").unwrap_or_else(|| "lido".into()),
            managers,
            max_connections: parse_or(&lookup, "LIDO_MAX_CONNECTIONS", 256)?,
            metrics_port: parse_opt(&lookup, "LIDO_METRICS_PORT")?,
            tls,
            tariff,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parse_opt<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(lookup, var)?.unwrap_or(default))
}

fn non_negative(var: &'static str, value: Decimal) -> Result<Decimal, ConfigError> {
    if value.is_sign_negative() {
        Err(ConfigError::Negative { var })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults() {
        let config = from_vars(&[]).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:5433");
        assert_eq!(config.password, "lido");
        assert!(config.managers.is_empty());
        assert_eq!(config.max_connections, 256);
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.tls, None);
        assert_eq!(config.tariff, Tariff::default());
    }

    #[test]
    fn managers_are_trimmed_and_deduplicated() {
        let config = from_vars(&[("LIDO_MANAGERS", " rita, sam,,rita ")]).unwrap();
        let expected: HashSet<String> = ["rita", "sam"].into_iter().map(String::from).collect();
        assert_eq!(config.managers, expected);
    }

    #[test]
    fn tariff_overrides() {
        let config = from_vars(&[
            ("LIDO_BASE_PRICE", "15.50"),
            ("LIDO_PRICE_PER_SEAT_DAY", "8"),
        ])
        .unwrap();
        assert_eq!(config.tariff.base, Decimal::new(1550, 2));
        assert_eq!(config.tariff.per_seat_day, Decimal::from(8));
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(matches!(
            from_vars(&[("LIDO_PORT", "seaside")]),
            Err(ConfigError::Invalid { var: "LIDO_PORT", .. })
        ));
        assert!(matches!(
            from_vars(&[("LIDO_METRICS_PORT", "70000")]),
            Err(ConfigError::Invalid { var: "LIDO_METRICS_PORT", .. })
        ));
        assert_eq!(
            from_vars(&[("LIDO_BASE_PRICE", "-1")]).unwrap_err(),
            ConfigError::Negative { var: "LIDO_BASE_PRICE" }
        );
    }

    #[test]
    fn tls_needs_both_paths() {
        assert_eq!(
            from_vars(&[("LIDO_TLS_CERT", "cert.pem")]).unwrap_err(),
            ConfigError::PartialTls
        );
        let config = from_vars(&[("LIDO_TLS_CERT", "c.pem"), ("LIDO_TLS_KEY", "k.pem")]).unwrap();
        assert_eq!(
            config.tls,
            Some(TlsPaths {
                cert: "c.pem".into(),
                key: "k.pem".into()
            })
        );
    }
}
