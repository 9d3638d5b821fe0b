use crate::cache::DEFAULT_TTL;
use crate::scanner::DEFAULT_DATA_DIR;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".aria_config";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid CACHE_TTL_SECS '{0}': expected a whole number of seconds")]
    InvalidTtl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cache_ttl: DEFAULT_TTL,
        }
    }
}

impl Config {
    /// Reads `KEY=value` lines from `path` on top of the defaults.
    ///
    /// A missing file is not an error; recognized keys are `DATA_DIR` and
    /// `CACHE_TTL_SECS`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Config::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut map = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            if let Some((k, v)) = line.split_once('=') {
                let key = k.trim();
                let val = v.trim().trim_matches('"');
                map.insert(key, val);
            }
        }

        let mut config = Config::default();
        if let Some(dir) = map.get("DATA_DIR").filter(|d| !d.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(ttl) = map.get("CACHE_TTL_SECS") {
            config.cache_ttl = parse_ttl(ttl)?;
        }
        Ok(config)
    }

    /// Applies command-line overrides.
    #[must_use]
    pub fn merge(mut self, data_dir: Option<PathBuf>, ttl_secs: Option<u64>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(secs) = ttl_secs {
            self.cache_ttl = Duration::from_secs(secs);
        }
        self
    }
}

fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidTtl(raw.to_string()))
}
