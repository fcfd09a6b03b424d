pub use crate::{
    config::{CounterConfig, StoreConfig},
    error::HandlerError,
    function::CounterFunction,
};

pub mod config;
pub mod dynamodb;
pub mod error;
pub mod function;
pub mod kv;
pub mod server;
