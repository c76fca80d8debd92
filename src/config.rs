use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    // HTTP listener
    pub bind_address: String,
    pub port: u16,

    // Snapshot source
    pub snapshot_dir: PathBuf,

    // Refresh timing
    pub refresh_interval_secs: u64,
    pub refresh_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8432,
            snapshot_dir: PathBuf::from("../backend"),
            refresh_interval_secs: 20,
            refresh_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_address: env::var("BIND_ADDRESS")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.bind_address),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),

            snapshot_dir: env::var("SNAPSHOT_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_dir),

            refresh_interval_secs: env::var("REFRESH_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.refresh_interval_secs),

            refresh_timeout_secs: env::var("REFRESH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.refresh_timeout_secs),
        }
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs.max(1))
    }
}
