use std::{
    env,
    fmt::Display,
    path::{Path, PathBuf},
    str::FromStr,
};

use thiserror::Error;
use tracing::info;

/// Optional file of `KEY=value` lines read at startup.
pub const ENV_FILE: &str = ".env";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to load {path}: {source}")]
    EnvFile {
        path: String,
        source: dotenvy::Error,
    },
}

/// Copies the variables in `path` into the process environment. Variables
/// that are already set keep their value. Returns `None` if the file is absent.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<Option<PathBuf>, ConfigError> {
    let path = path.as_ref();
    match dotenvy::from_path(path) {
        Ok(()) => Ok(Some(path.to_path_buf())),
        Err(e) if e.not_found() => Ok(None),
        Err(source) => Err(ConfigError::EnvFile {
            path: path.display().to_string(),
            source,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Mongo,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreKind::Mongo),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown store '{other}', expected mongo or memory")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub store: StoreKind,
    pub workers: Option<usize>,
    pub mongodb_uri: String,
    pub mongodb_database: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let workers = match lookup("GDS_WORKERS") {
            Some(value) => Some(parse_workers(&value)?),
            None => None,
        };

        Ok(Self {
            bind_address: try_load(&lookup, "GDS_BIND_ADDRESS", "127.0.0.1:3000")?,
            store: try_load(&lookup, "GDS_STORE", "mongo")?,
            workers,
            mongodb_uri: try_load(&lookup, "MONGODB_URI", "mongodb://localhost:27017")?,
            mongodb_database: try_load(&lookup, "MONGODB_DATABASE", "gds-connect")?,
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    match value.parse() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_workers(value: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key: "GDS_WORKERS",
        value: value.to_string(),
        reason,
    };

    match value.parse::<usize>() {
        Ok(0) => Err(invalid("must be greater than 0".to_string())),
        Ok(workers) => Ok(workers),
        Err(e) => Err(invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs};

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:3000");
        assert_eq!(config.store, StoreKind::Mongo);
        assert_eq!(config.workers, None);
        assert_eq!(config.mongodb_uri, "mongodb://localhost:27017");
        assert_eq!(config.mongodb_database, "gds-connect");
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("GDS_STORE", "Memory"),
            ("GDS_WORKERS", "2"),
            ("MONGODB_DATABASE", "test"),
        ]))
        .unwrap();
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.mongodb_database, "test");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = Config::from_lookup(lookup(&[("GDS_STORE", "redis")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "GDS_STORE", .. }));

        let err = Config::from_lookup(lookup(&[("GDS_WORKERS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "GDS_WORKERS", .. }));
    }

    #[test]
    fn env_file_fills_only_unset_variables() {
        let path = env::temp_dir().join(format!("gds-connect-{}.env", std::process::id()));
        fs::write(&path, "MONGODB_DATABASE=from-file\nGDS_WORKERS=3\n").unwrap();
        env::set_var("GDS_WORKERS", "5");

        let loaded = load_env_file(&path);
        let config = Config::load();

        env::remove_var("GDS_WORKERS");
        env::remove_var("MONGODB_DATABASE");
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded.unwrap(), Some(path));
        let config = config.unwrap();
        assert_eq!(config.mongodb_database, "from-file");
        assert_eq!(config.workers, Some(5));
    }

    #[test]
    fn missing_env_file_is_skipped() {
        let path = env::temp_dir().join("gds-connect-absent.env");
        assert_eq!(load_env_file(path).unwrap(), None);
    }
}
