use std::path::Path;
use std::time::Duration;

use crate::error::Error;

/// Default Tooling API version, matching the oldest org release the
/// scanner has been run against.
const DEFAULT_API_VERSION: u32 = 45;

/// Default delay between compile status polls.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Default poll attempt budget; 600 polls at the default interval waits
/// half an hour on the remote compile before giving up.
const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 600;

/// Scanner configuration loaded from `.orgscan.toml`.
pub struct Config {
    /// Tooling API version used to build endpoint URLs.
    pub api_version: u32,
    /// Delay between compile status polls.
    pub poll_interval: Duration,
    /// Status polls issued before giving up on the remote compile.
    pub poll_max_attempts: u32,
}

/// Raw TOML structure for `.orgscan.toml`.
#[derive(serde::Deserialize)]
struct OrgscanTomlConfig {
    /// Tooling API version.
    api_version: Option<u32>,
    /// Seconds between compile status polls.
    poll_interval_secs: Option<u64>,
    /// Poll attempt budget.
    poll_max_attempts: Option<u32>,
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    fn defaults() -> Self {
        return Self {
            api_version: DEFAULT_API_VERSION,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            poll_max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        };
    }

    /// Load config from `.orgscan.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist. Returns an error if
    /// the file exists but is malformed, never silently falling back to
    /// defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".orgscan.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::defaults()),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: OrgscanTomlConfig = toml::from_str(&content)?;
        let defaults = Self::defaults();
        return Ok(Self {
            api_version: raw.api_version.unwrap_or(defaults.api_version),
            poll_interval: raw
                .poll_interval_secs
                .map_or(defaults.poll_interval, Duration::from_secs),
            poll_max_attempts: raw.poll_max_attempts.unwrap_or(defaults.poll_max_attempts),
        });
    }
}
