use {
    thiserror::Error,
    counter_core::ResponseError,
    crate::kv::{StorageError, SqliteStoreConnectionError},
};

/// Error returned from a single invocation. None of these are turned into
/// a response, they are reported to the invocation host as a failure.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Store handle could not be created. Next invocation will try again.
    #[error("failed to init store: {0:?}")]
    StoreInit(#[from] StoreInitError),

    #[error("failed to increment counter: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to encode response: {0:?}")]
    ResponseEncoding(#[from] ResponseError),
}

#[derive(Error, Debug)]
pub enum StoreInitError {
    #[error("failed to open sqlite store: {0:?}")]
    Sqlite(#[from] SqliteStoreConnectionError),
}
