use {
    std::{collections::HashMap, future, path::Path, sync::{Arc, Mutex}},
    thiserror::Error,
    rusqlite::Connection,
    futures::future::{BoxFuture, FutureExt},
};

/// Counter records are only ever changed through an atomic add. There is no
/// read operation, values are observed as the result of an increment.
pub trait CounterStore {
    /// Adds `by` to numeric `attribute` of record `key`, creating the record if it does
    /// not exist yet, and returns the value after the update.
    fn increment<'a>(&'a self, key: &'a str, attribute: &'a str, by: u64) -> BoxFuture<'a, Result<u64, StorageError>>;
}

#[derive(Error, Debug)]
pub enum StorageError {
    /// Store could not be reached or failed internally.
    /// Similar to 503 response in http.
    #[error("store unavailable: {description}")]
    Unavailable {
        description: String,
    },

    /// Store rejected the request because of capacity or rate limits.
    #[error("store throttled request: {description}")]
    Throttled {
        description: String,
    },

    /// Credentials are missing or not allowed to update the record.
    #[error("not authorized to update record: {description}")]
    Unauthorized {
        description: String,
    },

    /// Store reported success, but the updated value is missing or is not a counter.
    #[error("malformed store response: {description}")]
    MalformedResponse {
        description: String,
    },

    #[error("counter overflow for key {key:?}")]
    Overflow {
        key: String,
    },
}

#[derive(Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

#[derive(Error, Debug)]
pub enum SqliteStoreConnectionError {
    #[error("failed to open connection: {0:?}")]
    ConnectionOpenError(rusqlite::Error),

    #[error("failed to init database: {0:?}")]
    DatabaseInitError(rusqlite::Error),
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SqliteStoreConnectionError> {
        Self::from_connection(
            Connection::open(path)
                .map_err(SqliteStoreConnectionError::ConnectionOpenError)?
        )
    }

    pub fn in_memory() -> Result<Self, SqliteStoreConnectionError> {
        Self::from_connection(
            Connection::open_in_memory()
                .map_err(SqliteStoreConnectionError::ConnectionOpenError)?
        )
    }

    fn from_connection(connection: Connection) -> Result<Self, SqliteStoreConnectionError> {
        connection.execute(
            // sqlite turns an overflowing integer sum into a real, the check rejects such update
            "create table if not exists counters (key text not null, attribute text not null, value integer not null check (typeof(value) = 'integer'), primary key (key, attribute))",
            (),
        ).map_err(SqliteStoreConnectionError::DatabaseInitError)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    fn increment_blocking(&self, key: &str, attribute: &str, by: u64) -> Result<u64, StorageError> {
        let by = i64::try_from(by).map_err(|_| StorageError::Overflow { key: key.to_owned() })?;
        let connection = self.connection.lock()
            .map_err(|err| StorageError::Unavailable { description: format!("failed to acquire sqlite connection: {err:?}") })?;

        // upsert is a single statement, so sqlite applies it atomically
        let value: i64 = connection.query_row(
            "insert into counters (key, attribute, value) values (?1, ?2, ?3) on conflict (key, attribute) do update set value = value + excluded.value returning value",
            (key, attribute, by),
            |row| row.get(0),
        ).map_err(|err| match err {
            rusqlite::Error::SqliteFailure(failure, _) if failure.code == rusqlite::ErrorCode::ConstraintViolation => StorageError::Overflow {
                key: key.to_owned(),
            },
            err @ (rusqlite::Error::InvalidColumnType(..) | rusqlite::Error::FromSqlConversionFailure(..)) => StorageError::MalformedResponse {
                description: format!("failed to decode sqlite result: {err:?}"),
            },
            err => StorageError::Unavailable { description: format!("failed to execute sqlite query: {err:?}") },
        })?;

        u64::try_from(value)
            .map_err(|_| StorageError::MalformedResponse { description: format!("counter value is negative: {value}") })
    }
}

impl CounterStore for SqliteStore {
    fn increment<'a>(&'a self, key: &'a str, attribute: &'a str, by: u64) -> BoxFuture<'a, Result<u64, StorageError>> {
        future::ready(self.increment_blocking(key, attribute, by)).boxed()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<(String, String), u64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn increment_blocking(&self, key: &str, attribute: &str, by: u64) -> Result<u64, StorageError> {
        let mut records = self.records.lock()
            .map_err(|err| StorageError::Unavailable { description: format!("failed to lock memory store: {err:?}") })?;
        let value = records.entry((key.to_owned(), attribute.to_owned())).or_insert(0);
        *value = value.checked_add(by).ok_or_else(|| StorageError::Overflow { key: key.to_owned() })?;
        Ok(*value)
    }
}

impl CounterStore for MemoryStore {
    fn increment<'a>(&'a self, key: &'a str, attribute: &'a str, by: u64) -> BoxFuture<'a, Result<u64, StorageError>> {
        future::ready(self.increment_blocking(key, attribute, by)).boxed()
    }
}

#[derive(Clone)]
pub struct BoxedStore {
    inner: Arc<Box<dyn CounterStore + Send + Sync>>,
}

impl BoxedStore {
    pub fn new<T: CounterStore + Send + Sync + 'static>(inner: T) -> Self {
        Self {
            inner: Arc::new(Box::new(inner)),
        }
    }
}

impl CounterStore for BoxedStore {
    fn increment<'a>(&'a self, key: &'a str, attribute: &'a str, by: u64) -> BoxFuture<'a, Result<u64, StorageError>> {
        self.inner.increment(key, attribute, by)
    }
}
