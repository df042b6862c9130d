use std::env;

use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the in-memory store is used.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub port: u16,
    pub allowed_origins: String,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                lookup("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            )?,
            jwt_secret,
            port: parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?,
            allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
            production: lookup("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup<'a>(vars: &'a HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| vars.get(name).map(|v| v.to_string())
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let vars = HashMap::from([("JWT_SECRET", "s3cret")]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.database_url, None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.allowed_origins, DEFAULT_ALLOWED_ORIGINS);
        assert!(!config.production);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let vars = HashMap::from([("DATABASE_URL", "postgres://localhost/eventhub")]);
        assert!(matches!(
            Config::from_lookup(lookup(&vars)),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
    }

    #[test]
    fn invalid_port_is_reported() {
        let vars = HashMap::from([("JWT_SECRET", "s3cret"), ("PORT", "eighty")]);
        assert!(matches!(
            Config::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
    }

    #[test]
    fn production_flag_is_case_insensitive() {
        let vars = HashMap::from([("JWT_SECRET", "s3cret"), ("RUST_ENV", "Production")]);
        assert!(Config::from_lookup(lookup(&vars)).unwrap().production);
    }
}
