use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use chrono::FixedOffset;
use dotenvy::dotenv;

use crate::engine::trigger::DEFAULT_SWEEP_INTERVAL_MINUTES;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub db_max_connections: u32,
    pub run_migrations: bool,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_admin_per_min: u32,

    // Auto-absence engine
    /// Fixed offset, not a zone: it ignores daylight saving, so it has to be
    /// changed by hand when the local clocks change.
    pub timezone_offset: FixedOffset,
    pub sweep_interval_minutes: i64,
    pub sweep_tick_seconds: u64, // 0 disables the ticker
    pub sweep_on_request: bool,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let sweep_interval_minutes =
            parsed(&get, "SWEEP_INTERVAL_MINUTES", DEFAULT_SWEEP_INTERVAL_MINUTES)?;
        if sweep_interval_minutes < 1 {
            bail!("SWEEP_INTERVAL_MINUTES must be at least 1");
        }

        Ok(Self {
            server_addr: required(&get, "SERVER_ADDR")?,
            database_url: required(&get, "DATABASE_URL")?,
            jwt_secret: required(&get, "JWT_SECRET")?,
            api_prefix: get("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            db_max_connections: parsed(&get, "DB_MAX_CONNECTIONS", 10)?,
            run_migrations: flag(&get, "RUN_MIGRATIONS", true)?,

            rate_protected_per_min: parsed(&get, "RATE_PROTECTED_PER_MIN", 1000)?,
            rate_admin_per_min: parsed(&get, "RATE_ADMIN_PER_MIN", 60)?,

            timezone_offset: parse_utc_offset(
                &get("TIMEZONE_OFFSET").unwrap_or_else(|| "+02:00".to_string()),
            )?,
            sweep_interval_minutes,
            sweep_tick_seconds: parsed(&get, "SWEEP_TICK_SECONDS", 60)?,
            sweep_on_request: flag(&get, "SWEEP_ON_REQUEST", true)?,

            log_dir: get("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: parsed(&get, "LOG_LEVEL", tracing::Level::INFO)?,
        })
    }
}

fn required(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    get(key).with_context(|| format!("{} must be set", key))
}

fn parsed<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has invalid value '{}': {}", key, raw, e)),
    }
}

fn flag(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => bail!("{} must be a boolean, got '{}'", key, v),
    }
}

/// Parses "+HH:MM" / "-HH:MM" (or "Z") into a fixed offset. Zone names such
/// as "Africa/Cairo" are refused rather than resolved.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(FixedOffset::east_opt(0).context("zero offset")?);
    }

    let invalid = || anyhow!(
            "TIMEZONE_OFFSET must be a fixed UTC offset like +02:00 (no zone names, update it for daylight saving), got '{}'",
            raw
        );

    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SERVER_ADDR", "127.0.0.1:8080"),
        ("DATABASE_URL", "mysql://root@localhost/attendance"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply_when_only_required_keys_are_set() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.sweep_interval_minutes, 5);
        assert_eq!(config.sweep_tick_seconds, 60);
        assert!(config.sweep_on_request);
        assert!(config.run_migrations);
        assert_eq!(config.timezone_offset.local_minus_utc(), 2 * 3600);
        assert_eq!(config.log_level, tracing::Level::INFO);
    }

    #[test]
    fn missing_required_key_is_reported() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).err().unwrap();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("SWEEP_INTERVAL_MINUTES", "10"),
            ("SWEEP_TICK_SECONDS", "0"),
            ("SWEEP_ON_REQUEST", "off"),
            ("TIMEZONE_OFFSET", "-05:30"),
            ("LOG_LEVEL", "debug"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.sweep_interval_minutes, 10);
        assert_eq!(config.sweep_tick_seconds, 0);
        assert!(!config.sweep_on_request);
        assert_eq!(config.timezone_offset.local_minus_utc(), -(5 * 3600 + 30 * 60));
        assert_eq!(config.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn bad_values_are_rejected() {
        for (key, value) in [
            ("SWEEP_INTERVAL_MINUTES", "0"),
            ("SWEEP_TICK_SECONDS", "soon"),
            ("SWEEP_ON_REQUEST", "maybe"),
            ("TIMEZONE_OFFSET", "Africa/Cairo"),
        ] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push((key, value));
            assert!(Config::from_lookup(lookup(&pairs)).is_err(), "{key}={value}");
        }
    }

    #[test]
    fn utc_offsets() {
        assert_eq!(parse_utc_offset("+02:00").unwrap().local_minus_utc(), 7200);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("02:00").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
    }

    #[test]
    fn zone_names_point_at_the_fixed_offset() {
        let err = parse_utc_offset("Africa/Cairo").unwrap_err().to_string();
        assert!(err.contains("fixed UTC offset"), "{err}");
        assert!(err.contains("daylight saving"), "{err}");
    }
}
