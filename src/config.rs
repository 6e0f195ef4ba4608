use std::{env, time::Duration};

use anyhow::Context;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(5);
pub const MAX_SCAN_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub const DEFAULT_LOGIN_URL: &str = "https://login.monespace.grdf.fr";
pub const DEFAULT_API_URL: &str = "https://monespace.grdf.fr";

/// GRDF account login and the PCE (delivery point) to query
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub pce: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("pce", &self.pce)
            .finish()
    }
}

/// When the account fetches: once after `initial_delay`, then every `interval`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            interval: DEFAULT_SCAN_INTERVAL,
        }
    }
}

impl Schedule {
    /// Recurring period actually used by the poller, kept within (0, MAX_SCAN_INTERVAL]
    pub fn scan_period(&self) -> Duration {
        self.interval.clamp(Duration::from_millis(1), MAX_SCAN_INTERVAL)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub schedule: Schedule,
    pub ha_url: String,
    pub ha_token: String,
    pub login_url: String,
    pub api_url: String,
}

impl Config {
    /// Loads the configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, validating required fields
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => anyhow::bail!("Missing required setting {key}"),
            }
        };
        let seconds = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => {
                    let secs: u64 = value
                        .trim()
                        .parse()
                        .with_context(|| format!("Invalid {key} value '{value}'"))?;
                    Ok(Duration::from_secs(secs))
                }
                _ => Ok(default),
            }
        };

        let credentials = Credentials {
            username: required("GAZPAR_USERNAME")?,
            password: required("GAZPAR_PASSWORD")?,
            pce: required("GAZPAR_PCE")?,
        };
        let schedule = Schedule {
            initial_delay: seconds("GAZPAR_INITIAL_DELAY_SECS", DEFAULT_INITIAL_DELAY)?,
            interval: seconds("GAZPAR_SCAN_INTERVAL_SECS", DEFAULT_SCAN_INTERVAL)?,
        };
        if schedule.interval.is_zero() || schedule.interval > MAX_SCAN_INTERVAL {
            anyhow::bail!(
                "GAZPAR_SCAN_INTERVAL_SECS must be between 1 and {}",
                MAX_SCAN_INTERVAL.as_secs()
            );
        }
        if schedule.initial_delay > MAX_SCAN_INTERVAL {
            anyhow::bail!(
                "GAZPAR_INITIAL_DELAY_SECS must be at most {}",
                MAX_SCAN_INTERVAL.as_secs()
            );
        }

        Ok(Self {
            credentials,
            schedule,
            ha_url: lookup("HA_URL").unwrap_or_default(),
            ha_token: lookup("HA_TOKEN").unwrap_or_default(),
            login_url: lookup("GAZPAR_LOGIN_URL")
                .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            api_url: lookup("GAZPAR_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }
}
