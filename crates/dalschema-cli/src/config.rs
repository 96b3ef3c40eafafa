use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use dalschema_core::{ConnectionDescriptor, Phase};

/// Environment variable consulted when no connection string is given.
pub const CONNECTION_ENV: &str = "DALSCHEMA_CONNECTION";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown phase: {0}")]
    UnknownPhase(String),
    #[error("{0} is required")]
    Missing(&'static str),
}

/// Values read from a `--config` TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub connection: Option<String>,
    pub database: Option<String>,
    #[serde(default)]
    pub skip_phases: Vec<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Settings for one load after flags, file, and environment are merged.
#[derive(Debug)]
pub struct LoadSettings {
    pub database: String,
    pub connection: ConnectionDescriptor,
    pub skip_phases: BTreeSet<Phase>,
}

/// Merge sources; flags win over the file, the file wins over the environment.
pub fn resolve(
    database: Option<String>,
    connection: Option<String>,
    skip_phases: &[String],
    file: FileConfig,
    env_connection: Option<String>,
) -> Result<LoadSettings, ConfigError> {
    let database = database
        .or(file.database)
        .ok_or(ConfigError::Missing("database name"))?;
    let connection = connection
        .or(file.connection)
        .or(env_connection)
        .ok_or(ConfigError::Missing("connection string"))?;

    let skip_phases = skip_phases
        .iter()
        .chain(file.skip_phases.iter())
        .map(|name| Phase::parse(name).ok_or_else(|| ConfigError::UnknownPhase(name.clone())))
        .collect::<Result<BTreeSet<_>, _>>()?;

    Ok(LoadSettings {
        database,
        connection: ConnectionDescriptor::new(connection),
        skip_phases,
    })
}
