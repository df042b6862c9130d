//! Mint a bearer token for an existing account.
//!
//! Usage: `issue_token <user-id> [admin|member] [hours]`, signed with `JWT_SECRET`.

use std::env;
use std::process::ExitCode;

use chrono::Duration;
use dotenvy::dotenv;
use uuid::Uuid;

use eventhub_server::auth::{issue_token, JwtKeys};
use eventhub_server::config::Config;
use eventhub_server::models::Role;

const DEFAULT_TTL_HOURS: i64 = 24;
const MAX_TTL_HOURS: i64 = 24 * 365;

fn ttl_hours(raw: Option<&str>) -> Option<i64> {
    match raw {
        None => Some(DEFAULT_TTL_HOURS),
        Some(raw) => raw
            .trim()
            .parse()
            .ok()
            .filter(|hours| (1..=MAX_TTL_HOURS).contains(hours)),
    }
}

fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(user_id) = args.first().and_then(|raw| Uuid::parse_str(raw).ok()) else {
        tracing::error!("Usage: issue_token <user-id> [admin|member] [hours]");
        return ExitCode::FAILURE;
    };
    let role = args
        .get(1)
        .map(|raw| Role::from_db(raw))
        .unwrap_or(Role::Member);
    let Some(hours) = ttl_hours(args.get(2).map(String::as_str)) else {
        tracing::error!("Token lifetime must be between 1 and {} hours", MAX_TTL_HOURS);
        return ExitCode::FAILURE;
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let keys = JwtKeys::new(config.jwt_secret.as_bytes());
    match issue_token(&keys, user_id, role, Duration::hours(hours)) {
        Ok(token) => {
            println!("{}", token);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Could not issue token");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_defaults_when_absent() {
        assert_eq!(ttl_hours(None), Some(DEFAULT_TTL_HOURS));
        assert_eq!(ttl_hours(Some("48")), Some(48));
    }

    #[test]
    fn lifetime_outside_bounds_is_refused() {
        assert_eq!(ttl_hours(Some("0")), None);
        assert_eq!(ttl_hours(Some("-3")), None);
        assert_eq!(ttl_hours(Some("1000000000000")), None);
        assert_eq!(ttl_hours(Some("forever")), None);
    }
}
