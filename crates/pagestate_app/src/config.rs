use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use pagestate_core::PagingCursorConfig;
use pagestate_logging::LogDestination;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_CONFIG_FILENAME: &str = "pagestate.ron";

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Settings for one demo run, read from a RON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub cursor: PagingCursorConfig,
    pub total_items: u32,
    pub page_size: u32,
    pub latency_ms: u64,
    /// The first request for this page fails once.
    pub flaky_page: Option<u32>,
    pub retry: bool,
    pub online: bool,
    pub guard_in_flight: bool,
    pub wait_secs: u64,
    pub verbose: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cursor: PagingCursorConfig::default(),
            total_items: 45,
            page_size: 10,
            latency_ms: 50,
            flaky_page: None,
            retry: true,
            online: true,
            guard_in_flight: true,
            wait_secs: 10,
            verbose: false,
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Reads the config at `path`; a missing file yields the defaults.
pub(crate) fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
