use {
    tracing::debug,
    futures::future::{BoxFuture, FutureExt},
    aws_config::{BehaviorVersion, retry::RetryConfig},
    aws_sdk_dynamodb::{
        Client,
        error::{SdkError, ProvideErrorMetadata, DisplayErrorContext},
        operation::update_item::{UpdateItemError, UpdateItemOutput},
        types::{AttributeValue, ReturnValue},
    },
    crate::kv::{CounterStore, StorageError},
};

const THROTTLING_ERROR_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "ThrottlingException",
];

const UNAUTHORIZED_ERROR_CODES: &[&str] = &[
    "AccessDeniedException",
    "ExpiredTokenException",
    "InvalidSignatureException",
    "MissingAuthenticationTokenException",
    "UnrecognizedClientException",
];

/// Counter records kept in a DynamoDB table with a single string partition key.
#[derive(Clone)]
pub struct DynamoDbStore {
    client: Client,
    table_name: String,
    partition_key: String,
}

impl DynamoDbStore {
    pub fn new(client: Client, table_name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            partition_key: partition_key.into(),
        }
    }

    /// Region and credentials are resolved from the environment of the execution context.
    /// Failed requests are not retried, the error goes straight to the invocation host.
    pub async fn from_env(table_name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::disabled())
            .load()
            .await;
        Self::new(Client::new(&sdk_config), table_name, partition_key)
    }

    async fn add(&self, key: &str, attribute: &str, by: u64) -> Result<u64, StorageError> {
        debug!("adding {by} to {attribute:?} of {key:?} in table {:?}", self.table_name);

        // ADD creates both the item and the attribute when they are missing
        let output = self.client.update_item()
            .table_name(&self.table_name)
            .key(&self.partition_key, AttributeValue::S(key.to_owned()))
            .update_expression("ADD #v :inc")
            .expression_attribute_names("#v", attribute)
            .expression_attribute_values(":inc", AttributeValue::N(by.to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .map_err(classify_update_error)?;

        read_updated_value(&output, attribute)
    }
}

impl CounterStore for DynamoDbStore {
    fn increment<'a>(&'a self, key: &'a str, attribute: &'a str, by: u64) -> BoxFuture<'a, Result<u64, StorageError>> {
        self.add(key, attribute, by).boxed()
    }
}

fn classify_update_error(err: SdkError<UpdateItemError>) -> StorageError {
    let code = err.code().map(|v| v.to_owned());
    let description = format!("{}", DisplayErrorContext(&err));

    match err.as_service_error() {
        Some(UpdateItemError::ProvisionedThroughputExceededException(_))
        | Some(UpdateItemError::RequestLimitExceeded(_)) => return StorageError::Throttled { description },
        _ => {},
    }

    match code.as_deref() {
        Some(code) if THROTTLING_ERROR_CODES.contains(&code) => StorageError::Throttled { description },
        Some(code) if UNAUTHORIZED_ERROR_CODES.contains(&code) => StorageError::Unauthorized { description },
        _ => StorageError::Unavailable { description },
    }
}

fn read_updated_value(output: &UpdateItemOutput, attribute: &str) -> Result<u64, StorageError> {
    let value = output.attributes()
        .and_then(|attributes| attributes.get(attribute))
        .ok_or_else(|| StorageError::MalformedResponse {
            description: format!("updated attributes do not contain {attribute:?}"),
        })?;

    let value = value.as_n()
        .map_err(|other| StorageError::MalformedResponse {
            description: format!("attribute {attribute:?} is not a number: {other:?}"),
        })?;

    value.parse::<u64>()
        .map_err(|err| StorageError::MalformedResponse {
            description: format!("failed to parse counter value {value:?}: {err:?}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_updated_counter() {
        let output = UpdateItemOutput::builder()
            .attributes("views", AttributeValue::N("3".to_owned()))
            .build();
        assert_eq!(3, read_updated_value(&output, "views").unwrap());
    }

    #[test]
    fn missing_attribute_is_malformed() {
        let output = UpdateItemOutput::builder().build();
        assert!(matches!(read_updated_value(&output, "views"), Err(StorageError::MalformedResponse { .. })));
    }

    #[test]
    fn non_numeric_attribute_is_malformed() {
        let output = UpdateItemOutput::builder()
            .attributes("views", AttributeValue::S("three".to_owned()))
            .build();
        assert!(matches!(read_updated_value(&output, "views"), Err(StorageError::MalformedResponse { .. })));
    }
}
