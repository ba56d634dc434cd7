//! Storage-layer configuration

use std::path::PathBuf;

const DB_FILE_NAME: &str = "oms.redb";

/// Configuration for the storage layer
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the database file
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("OMS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/var/lib/oms")),
        }
    }

    /// Create a config with an explicit data directory (tests, embedding)
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Full path of the database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_path_joins_data_dir() {
        let config = Config::with_data_dir("/tmp/oms-test");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/oms-test/oms.redb"));
    }
}
