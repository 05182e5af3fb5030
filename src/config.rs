//! Match configuration.
//!
//! All fields have defaults, so a config file only needs the values it
//! changes. Timeouts are off unless set: a stalled peer then stalls the
//! match, the same as a lost wake signal would.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::source::SourceKind;

/// Default mailbox re-check interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Upper bound between mailbox re-checks while waiting.
    pub poll_interval_ms: u64,
    /// Bound on each peer wait (start signal, opponent move).
    pub turn_timeout_ms: Option<u64>,
    /// Bound on the coordinator's bootstrap and terminal-flag waits.
    pub game_timeout_ms: Option<u64>,
    /// Seed for random move sources; white uses `seed + 1`.
    pub seed: Option<u64>,
    pub black: SourceKind,
    pub white: SourceKind,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            turn_timeout_ms: None,
            game_timeout_ms: None,
            seed: None,
            black: SourceKind::Random,
            white: SourceKind::Random,
        }
    }
}

impl MatchConfig {
    /// Loads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("[CONFIG] Loaded match config from {:?}", path);
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn turn_timeout(&self) -> Option<Duration> {
        self.turn_timeout_ms.map(Duration::from_millis)
    }

    pub fn game_timeout(&self) -> Option<Duration> {
        self.game_timeout_ms.map(Duration::from_millis)
    }

    pub fn seed_for_white(&self) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(1))
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: MatchConfig =
            serde_json::from_str(r#"{ "turn_timeout_ms": 2000, "black": "first" }"#).unwrap();

        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.turn_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.game_timeout(), None);
        assert_eq!(config.black, SourceKind::First);
        assert_eq!(config.white, SourceKind::Random);
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let config = MatchConfig {
            poll_interval_ms: 0,
            ..MatchConfig::default()
        };

        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn white_seed_is_offset_from_black() {
        let config = MatchConfig {
            seed: Some(u64::MAX),
            ..MatchConfig::default()
        };

        assert_eq!(config.seed_for_white(), Some(0));
        assert_eq!(MatchConfig::default().seed_for_white(), None);
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = env::temp_dir();
        let missing = dir.join("reversi-mailbox-missing-config.json");
        let _ = fs::remove_file(&missing);
        assert!(matches!(MatchConfig::load(&missing), Err(ConfigError::Io { .. })));

        let broken = dir.join(format!("reversi-mailbox-broken-{}.json", std::process::id()));
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(MatchConfig::load(&broken), Err(ConfigError::Parse { .. })));

        let good = dir.join(format!("reversi-mailbox-good-{}.json", std::process::id()));
        fs::write(&good, r#"{ "seed": 9, "white": "stdin" }"#).unwrap();
        let config = MatchConfig::load(&good).unwrap();
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.white, SourceKind::Stdin);

        let _ = fs::remove_file(&broken);
        let _ = fs::remove_file(&good);
    }
}
