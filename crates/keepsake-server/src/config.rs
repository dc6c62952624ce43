use anyhow::{Context, Result, bail};
use tracing::warn;

use keepsake_core::clock::DayClock;
use keepsake_core::gate::{AccessPolicy, DEFAULT_ALLOWED_EMAILS};

const DEV_SECRET: &str = "dev-secret-change-me";

/// Server settings, read from `KEEPSAKE_*` environment variables.
#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub policy: AccessPolicy,
    pub clock: DayClock,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("KEEPSAKE_JWT_SECRET", DEV_SECRET);
        if jwt_secret == DEV_SECRET {
            warn!("KEEPSAKE_JWT_SECRET is not set, using the development secret");
        }

        let port = get("KEEPSAKE_PORT", "3000");
        let port: u16 = port
            .parse()
            .with_context(|| format!("KEEPSAKE_PORT must be a port number, got '{}'", port))?;

        let policy = match var("KEEPSAKE_ALLOWED_EMAILS") {
            Some(list) => AccessPolicy::new(list.split(',').filter(|e| !e.trim().is_empty())),
            None => AccessPolicy::new(DEFAULT_ALLOWED_EMAILS),
        };
        if policy.is_empty() {
            bail!("KEEPSAKE_ALLOWED_EMAILS lists nobody");
        }

        let zone = get("KEEPSAKE_TIMEZONE", "Europe/Stockholm");
        let Some(clock) = DayClock::from_name(&zone) else {
            bail!("KEEPSAKE_TIMEZONE '{}' is not an IANA zone", zone);
        };

        Ok(Self {
            host: get("KEEPSAKE_HOST", "0.0.0.0"),
            port,
            db_path: get("KEEPSAKE_DB_PATH", "keepsake.db"),
            jwt_secret,
            policy,
            clock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, "keepsake.db");
        assert_eq!(config.clock, DayClock::default());
        assert!(config.policy.is_allowed("MI423MA@gmail.com"));
        assert_eq!(config.policy.len(), 2);
    }

    #[test]
    fn allow_list_from_env() {
        let config = load(&[("KEEPSAKE_ALLOWED_EMAILS", " a@b.se, ,C@d.se ")]).unwrap();
        assert_eq!(config.policy.len(), 2);
        assert!(config.policy.is_allowed("c@d.se"));
        assert!(!config.policy.is_allowed("mi423ma@gmail.com"));

        assert!(load(&[("KEEPSAKE_ALLOWED_EMAILS", " , ")]).is_err());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("KEEPSAKE_PORT", "eighty")]).is_err());
        assert!(load(&[("KEEPSAKE_TIMEZONE", "Mars/Olympus")]).is_err());
    }
}
