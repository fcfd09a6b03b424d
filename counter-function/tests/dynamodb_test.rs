use {
    aws_sdk_dynamodb::{
        Client,
        config::retry::RetryConfig,
        operation::{
            get_item::GetItemOutput,
            put_item::PutItemOutput,
            update_item::{UpdateItemError, UpdateItemInput, UpdateItemOutput},
        },
        types::{AttributeValue, ReturnValue, error::ProvisionedThroughputExceededException},
    },
    aws_smithy_mocks::{RuleMode, mock, mock_client},
    aws_smithy_runtime_api::http::{Response, StatusCode},
    aws_smithy_types::body::SdkBody,
    counter_function::{dynamodb::DynamoDbStore, kv::{CounterStore, StorageError}},
};

const TABLE_NAME: &str = "test-visitor-count";

fn is_atomic_add(req: &UpdateItemInput) -> bool {
    req.table_name() == Some(TABLE_NAME)
        && req.key().and_then(|key| key.get("id")) == Some(&AttributeValue::S("1".to_owned()))
        && req.update_expression() == Some("ADD #v :inc")
        && req.expression_attribute_names().and_then(|names| names.get("#v")) == Some(&"views".to_owned())
        && req.expression_attribute_values().and_then(|values| values.get(":inc")) == Some(&AttributeValue::N("1".to_owned()))
        && req.return_values() == Some(&ReturnValue::UpdatedNew)
}

fn error_response(error_type: &str) -> Response {
    let body = format!("{{\"__type\":\"com.amazonaws.dynamodb.v20120810#{error_type}\",\"message\":\"request rejected\"}}");
    Response::new(StatusCode::try_from(400).unwrap(), SdkBody::from(body))
}

#[tokio::test]
async fn single_update_item_with_atomic_add() {
    let update_item = mock!(Client::update_item)
        .match_requests(is_atomic_add)
        .then_output(|| UpdateItemOutput::builder()
            .attributes("views", AttributeValue::N("3".to_owned()))
            .build());
    let get_item = mock!(Client::get_item).then_output(|| GetItemOutput::builder().build());
    let put_item = mock!(Client::put_item).then_output(|| PutItemOutput::builder().build());

    let client = mock_client!(aws_sdk_dynamodb, RuleMode::MatchAny, [&update_item, &get_item, &put_item]);
    let store = DynamoDbStore::new(client, TABLE_NAME, "id");

    assert_eq!(3, store.increment("1", "views", 1).await.unwrap());
    assert_eq!(1, update_item.num_calls());
    assert_eq!(0, get_item.num_calls());
    assert_eq!(0, put_item.num_calls());
}

#[tokio::test]
async fn update_without_returned_attribute_is_malformed() {
    let update_item = mock!(Client::update_item).then_output(|| UpdateItemOutput::builder().build());
    let client = mock_client!(aws_sdk_dynamodb, [&update_item]);
    let store = DynamoDbStore::new(client, TABLE_NAME, "id");

    assert!(matches!(store.increment("1", "views", 1).await, Err(StorageError::MalformedResponse { .. })));
}

#[tokio::test]
async fn throttling_response_is_throttled() {
    let update_item = mock!(Client::update_item).then_http_response(|| error_response("ThrottlingException"));
    let client = mock_client!(
        aws_sdk_dynamodb,
        RuleMode::Sequential,
        [&update_item],
        |builder| builder.retry_config(RetryConfig::disabled())
    );
    let store = DynamoDbStore::new(client, TABLE_NAME, "id");

    match store.increment("1", "views", 1).await {
        Err(StorageError::Throttled { .. }) => {},
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(1, update_item.num_calls());
}

#[tokio::test]
async fn provisioned_throughput_exceeded_is_throttled() {
    let update_item = mock!(Client::update_item).then_error(|| UpdateItemError::ProvisionedThroughputExceededException(
        ProvisionedThroughputExceededException::builder().message("capacity exceeded").build()
    ));
    let client = mock_client!(
        aws_sdk_dynamodb,
        RuleMode::Sequential,
        [&update_item],
        |builder| builder.retry_config(RetryConfig::disabled())
    );
    let store = DynamoDbStore::new(client, TABLE_NAME, "id");

    assert!(matches!(store.increment("1", "views", 1).await, Err(StorageError::Throttled { .. })));
}

#[tokio::test]
async fn unrecognized_client_is_unauthorized() {
    let update_item = mock!(Client::update_item).then_http_response(|| error_response("UnrecognizedClientException"));
    let client = mock_client!(
        aws_sdk_dynamodb,
        RuleMode::Sequential,
        [&update_item],
        |builder| builder.retry_config(RetryConfig::disabled())
    );
    let store = DynamoDbStore::new(client, TABLE_NAME, "id");

    assert!(matches!(store.increment("1", "views", 1).await, Err(StorageError::Unauthorized { .. })));
}
