use {
    std::{env, fs, io, path::{Path, PathBuf}},
    serde::Deserialize,
    thiserror::Error,
};

pub const ENV_TABLE_NAME: &str = "TABLE_NAME";
pub const ENV_ALLOWED_ORIGIN: &str = "ALLOWED_ORIGIN";
pub const ENV_RECORD_KEY: &str = "COUNTER_KEY";
pub const ENV_PARTITION_KEY: &str = "COUNTER_PARTITION_KEY";
pub const ENV_ATTRIBUTE: &str = "COUNTER_ATTRIBUTE";
pub const ENV_STORE: &str = "COUNTER_STORE";
pub const ENV_SQLITE_PATH: &str = "COUNTER_SQLITE_PATH";
pub const ENV_CONFIG_MODE: &str = "COUNTER_CONFIG_MODE";

pub const DEFAULT_TABLE_NAME: &str = "cloud-resume-challenge";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "*";

#[derive(Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct CounterConfig {
    pub table_name: String,
    pub allowed_origin: String,

    #[serde(default = "default_record_key")]
    pub record_key: String,
    #[serde(default = "default_partition_key")]
    pub partition_key: String,
    #[serde(default = "default_attribute")]
    pub attribute: String,

    #[serde(default)]
    pub store: StoreConfig,
}

fn default_record_key() -> String {
    "1".to_owned()
}

fn default_partition_key() -> String {
    "id".to_owned()
}

fn default_attribute() -> String {
    "views".to_owned()
}

#[derive(Deserialize, Debug, Clone, Default, Eq, PartialEq)]
#[serde(tag = "driver")]
pub enum StoreConfig {
    #[default]
    #[serde(rename = "dynamodb")]
    DynamoDb,
    #[serde(rename = "sqlite")]
    Sqlite {
        path: Option<String>,
    },
    #[serde(rename = "memory")]
    Memory,
}

/// Strict mode refuses to start without an explicit table and origin,
/// lenient mode falls back to defaults.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum ConfigMode {
    Strict,
    Lenient,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required configuration is missing: {name}")]
    MissingVariable {
        name: &'static str,
    },

    #[error("configuration value is empty: {field}")]
    EmptyValue {
        field: &'static str,
    },

    #[error("unknown store driver: {driver:?}")]
    UnknownStoreDriver {
        driver: String,
    },

    #[error("unknown config mode: {mode:?}")]
    UnknownConfigMode {
        mode: String,
    },

    #[error("failed to read config file {path:?}: {reason:?}")]
    FailedToRead {
        path: PathBuf,
        reason: io::Error,
    },

    #[error("failed to parse config file: {0:?}")]
    FailedToParse(#[from] serde_yml::Error),
}

impl CounterConfig {
    pub fn new(table_name: impl Into<String>, allowed_origin: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            allowed_origin: allowed_origin.into(),
            record_key: default_record_key(),
            partition_key: default_partition_key(),
            attribute: default_attribute(),
            store: StoreConfig::default(),
        }
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn with_record_key(mut self, record_key: impl Into<String>) -> Self {
        self.record_key = record_key.into();
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // empty values are treated the same way as unset ones
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mode = match lookup(ENV_CONFIG_MODE).as_deref() {
            None | Some("strict") => ConfigMode::Strict,
            Some("lenient") => ConfigMode::Lenient,
            Some(other) => return Err(ConfigError::UnknownConfigMode { mode: other.to_owned() }),
        };

        let required = |name: &'static str, default: &str| match (lookup(name), mode) {
            (Some(v), _) => Ok(v),
            (None, ConfigMode::Lenient) => Ok(default.to_owned()),
            (None, ConfigMode::Strict) => Err(ConfigError::MissingVariable { name }),
        };

        let store = match lookup(ENV_STORE).as_deref() {
            None | Some("dynamodb") => StoreConfig::DynamoDb,
            Some("sqlite") => StoreConfig::Sqlite { path: lookup(ENV_SQLITE_PATH) },
            Some("memory") => StoreConfig::Memory,
            Some(other) => return Err(ConfigError::UnknownStoreDriver { driver: other.to_owned() }),
        };

        Ok(Self {
            table_name: required(ENV_TABLE_NAME, DEFAULT_TABLE_NAME)?,
            allowed_origin: required(ENV_ALLOWED_ORIGIN, DEFAULT_ALLOWED_ORIGIN)?,
            record_key: lookup(ENV_RECORD_KEY).unwrap_or_else(default_record_key),
            partition_key: lookup(ENV_PARTITION_KEY).unwrap_or_else(default_partition_key),
            attribute: lookup(ENV_ATTRIBUTE).unwrap_or_else(default_attribute),
            store,
        })
    }

    pub fn load(file_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file_path = file_path.as_ref();
        let contents = fs::read(file_path)
            .map_err(|reason| ConfigError::FailedToRead { path: file_path.to_owned(), reason })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_slice(contents)?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        let fields = [
            ("table_name", &self.table_name),
            ("allowed_origin", &self.allowed_origin),
            ("record_key", &self.record_key),
            ("partition_key", &self.partition_key),
            ("attribute", &self.attribute),
        ];

        let empty = fields
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field);
        match empty {
            Some(field) => Err(ConfigError::EmptyValue { field }),
            None => Ok(self),
        }
    }
}
