use {
    tracing::info,
    tokio::sync::OnceCell,
    serde_json::Value,
    counter_core::{CorsPolicy, CountBody, FunctionResponse},
    crate::{
        config::{CounterConfig, StoreConfig},
        dynamodb::DynamoDbStore,
        error::{HandlerError, StoreInitError},
        kv::{BoxedStore, CounterStore, MemoryStore, SqliteStore},
    },
};

/// Visitor counter function.
///
/// Holds nothing but configuration and a store handle, which is created on the first
/// invocation and reused by the following ones in the same execution context.
pub struct CounterFunction {
    config: CounterConfig,
    cors: CorsPolicy,
    store: OnceCell<BoxedStore>,
}

impl CounterFunction {
    pub fn new(config: CounterConfig) -> Self {
        Self::from_parts(config, OnceCell::new())
    }

    pub fn with_store(config: CounterConfig, store: BoxedStore) -> Self {
        Self::from_parts(config, OnceCell::new_with(Some(store)))
    }

    fn from_parts(config: CounterConfig, store: OnceCell<BoxedStore>) -> Self {
        Self {
            cors: CorsPolicy::new(config.allowed_origin.clone()),
            config,
            store,
        }
    }

    pub fn is_store_initialized(&self) -> bool {
        self.store.initialized()
    }

    /// Event payload is not inspected, every invocation is a single increment.
    pub async fn handle(&self, _event: Value) -> Result<FunctionResponse, HandlerError> {
        let store = self.store.get_or_try_init(|| store_from_config(&self.config)).await?;
        let views = store.increment(&self.config.record_key, &self.config.attribute, 1).await?;
        info!("counter {:?} incremented to {views}", self.config.record_key);

        Ok(FunctionResponse::ok()
            .with_cors(&self.cors)
            .with_json(&CountBody::new(views))?)
    }
}

pub async fn store_from_config(config: &CounterConfig) -> Result<BoxedStore, StoreInitError> {
    info!("initializing {:?} store", config.store);

    Ok(match &config.store {
        StoreConfig::DynamoDb => BoxedStore::new(DynamoDbStore::from_env(&config.table_name, &config.partition_key).await),
        StoreConfig::Sqlite { path: Some(path) } => BoxedStore::new(SqliteStore::new(path)?),
        StoreConfig::Sqlite { path: None } => BoxedStore::new(SqliteStore::in_memory()?),
        StoreConfig::Memory => BoxedStore::new(MemoryStore::new()),
    })
}
