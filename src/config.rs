use std::collections::HashMap;

use anyhow::Context;
use serde::Deserialize;

/// Work factor used for every bcrypt hash this service produces.
pub const HASH_COST: u32 = 10;

const DEFAULT_TTL_SECONDS: i64 = 24 * 60 * 60;
const MAX_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_seconds: i64,
}

/// Default passwords of the seeded demo accounts.
///
/// Only consulted for records still holding an unmigrated credential: the
/// login path compares against it (when `login_enabled`), and the migration
/// hashes it, using `fallback` for any email outside the table.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyPasswords {
    pub accounts: HashMap<String, String>,
    pub fallback: String,
    pub login_enabled: bool,
}

impl LegacyPasswords {
    pub fn demo() -> Self {
        let accounts = [
            ("admin@eduflows.com", "admin123"),
            ("prof@eduflows.com", "prof123"),
            ("etudiant@eduflows.com", "etudiant123"),
        ]
        .into_iter()
        .map(|(email, password)| (email.to_string(), password.to_string()))
        .collect();
        Self {
            accounts,
            fallback: "password123".into(),
            login_enabled: true,
        }
    }

    /// Password accepted at login for an unmigrated record, if any.
    pub fn login_password(&self, email: &str) -> Option<&str> {
        if !self.login_enabled {
            return None;
        }
        self.accounts.get(email).map(String::as_str)
    }

    /// Password the migration assigns to an unmigrated record.
    pub fn migration_password(&self, email: &str) -> &str {
        self.accounts
            .get(email)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub jwt: JwtConfig,
    pub legacy: LegacyPasswords,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| database_url_from_parts());

        let environment = std::env::var("APP_ENV")
            .or_else(|_| std::env::var("NODE_ENV"))
            .unwrap_or_else(|_| "development".into());

        let port = std::env::var("APP_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok()
            .map(|v| v.parse::<u16>().context("parse APP_PORT"))
            .transpose()?
            .unwrap_or(3000);

        let ttl_seconds = match (
            std::env::var("JWT_TTL_MINUTES").ok(),
            std::env::var("JWT_EXPIRE").ok(),
        ) {
            (Some(minutes), _) => parse_ttl_minutes(&minutes)?,
            (None, Some(expire)) => parse_ttl(&expire)?,
            (None, None) => DEFAULT_TTL_SECONDS,
        };

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            ttl_seconds,
        };

        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:5555".into(),
                    "http://localhost:3000".into(),
                    "http://localhost:3001".into(),
                ]
            });

        let mut legacy = LegacyPasswords::demo();
        legacy.login_enabled = match std::env::var("LEGACY_LOGIN") {
            Ok(v) => v.parse::<bool>().context("parse LEGACY_LOGIN")?,
            Err(_) => environment != "production",
        };

        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            environment,
            cors_origins,
            jwt,
            legacy,
        })
    }
}

fn database_url_from_parts() -> String {
    let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.into());
    format!(
        "postgres://{}:{}@{}:{}/{}",
        var("DB_USER", "eduflows_user"),
        var("DB_PASSWORD", "eduflows_password"),
        var("DB_HOST", "postgres"),
        var("DB_PORT", "5432"),
        var("DB_NAME", "eduflows_db"),
    )
}

/// Parses a token lifetime such as `3600`, `45s`, `30m`, `24h` or `7d` into seconds.
pub fn parse_ttl(raw: &str) -> anyhow::Result<i64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let amount: i64 = digits
        .parse()
        .with_context(|| format!("invalid token lifetime {raw:?}"))?;
    let factor = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        other => anyhow::bail!("unknown token lifetime unit {other:?}"),
    };
    check_ttl(amount.checked_mul(factor), raw)
}

/// Parses a token lifetime given in whole minutes into seconds.
pub fn parse_ttl_minutes(raw: &str) -> anyhow::Result<i64> {
    let minutes: i64 = raw.trim().parse().context("parse JWT_TTL_MINUTES")?;
    check_ttl(minutes.checked_mul(60), raw)
}

/// Token lifetimes must be positive and at most one year.
fn check_ttl(seconds: Option<i64>, raw: &str) -> anyhow::Result<i64> {
    match seconds {
        Some(s) if s > 0 && s <= MAX_TTL_SECONDS => Ok(s),
        _ => anyhow::bail!("token lifetime {raw:?} must be between 1 second and 365 days"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ttl_accepts_units() {
        assert_eq!(parse_ttl("3600").unwrap(), 3600);
        assert_eq!(parse_ttl("45s").unwrap(), 45);
        assert_eq!(parse_ttl("30m").unwrap(), 1800);
        assert_eq!(parse_ttl("24h").unwrap(), 86_400);
        assert_eq!(parse_ttl("7d").unwrap(), 604_800);
    }

    #[test]
    fn parse_ttl_rejects_garbage() {
        assert!(parse_ttl("").is_err());
        assert!(parse_ttl("h").is_err());
        assert!(parse_ttl("10w").is_err());
    }

    #[test]
    fn parse_ttl_rejects_out_of_range() {
        assert!(parse_ttl("0").is_err());
        assert!(parse_ttl("0h").is_err());
        assert!(parse_ttl("99999999999d").is_err());
        assert!(parse_ttl("366d").is_err());
        assert_eq!(parse_ttl("365d").unwrap(), MAX_TTL_SECONDS);
    }

    #[test]
    fn ttl_minutes_must_be_positive_and_bounded() {
        assert_eq!(parse_ttl_minutes("60").unwrap(), 3600);
        assert!(parse_ttl_minutes("-5").is_err());
        assert!(parse_ttl_minutes("0").is_err());
        assert!(parse_ttl_minutes(&i64::MAX.to_string()).is_err());
        assert!(parse_ttl_minutes("soon").is_err());
    }

    #[test]
    fn legacy_table_holds_demo_accounts() {
        let legacy = LegacyPasswords::demo();
        assert_eq!(legacy.accounts.len(), 3);
        assert_eq!(legacy.login_password("admin@eduflows.com"), Some("admin123"));
        assert_eq!(legacy.login_password("prof@eduflows.com"), Some("prof123"));
        assert_eq!(legacy.login_password("etudiant@eduflows.com"), Some("etudiant123"));
        assert_eq!(legacy.login_password("someone@eduflows.com"), None);
    }

    #[test]
    fn migration_falls_back_for_unknown_email() {
        let legacy = LegacyPasswords::demo();
        assert_eq!(legacy.migration_password("prof@eduflows.com"), "prof123");
        assert_eq!(legacy.migration_password("other@eduflows.com"), "password123");
    }

    #[test]
    fn disabled_login_ignores_table_but_migration_still_uses_it() {
        let mut legacy = LegacyPasswords::demo();
        legacy.login_enabled = false;
        assert_eq!(legacy.login_password("admin@eduflows.com"), None);
        assert_eq!(legacy.migration_password("admin@eduflows.com"), "admin123");
    }
}
