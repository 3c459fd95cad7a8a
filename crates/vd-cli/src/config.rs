use std::path::PathBuf;

use vd_core::profile::MIN_REGISTRATION_AGE;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the JSON state file (profile + streaks).
    pub state_path: PathBuf,
    /// Fixed RNG seed; entropy when unset.
    pub seed: Option<u64>,
    /// Minimum age, by calendar-year difference, to register or set a birth date.
    pub min_age: i32,
}

impl Config {
    /// Load configuration from `VD_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("virgin-detector");

        let state_path = std::env::var("VD_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("state.json"));

        Self {
            state_path,
            seed: env_parse("VD_SEED"),
            min_age: env_parse("VD_MIN_AGE").unwrap_or(MIN_REGISTRATION_AGE),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
