use std::path::PathBuf;

const DEFAULT_WAL_CHANNEL: usize = 4096;

/// Runtime settings, read from `RECURRA_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding `reservations.wal`. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// JSON file with the assets to load into the catalog.
    pub assets_file: Option<PathBuf>,
    pub metrics_port: Option<u16>,
    pub wal_channel_capacity: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            data_dir: lookup("RECURRA_DATA_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            assets_file: lookup("RECURRA_ASSETS")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            metrics_port: lookup("RECURRA_METRICS_PORT").and_then(|s| s.parse().ok()),
            wal_channel_capacity: lookup("RECURRA_WAL_CHANNEL")
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_WAL_CHANNEL),
        }
    }

    pub fn wal_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("reservations.wal"))
    }
}
