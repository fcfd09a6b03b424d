use {
    std::{net::SocketAddr, sync::Arc},
    tokio::{io::{AsyncReadExt, AsyncWriteExt}, net::{TcpListener, TcpStream}},
    counter_function::{
        CounterConfig,
        CounterFunction,
        StoreConfig,
        kv::{BoxedStore, CounterStore, StorageError},
        server::serve,
    },
    futures::future::{self, BoxFuture, FutureExt},
};

struct UnavailableStore;

impl CounterStore for UnavailableStore {
    fn increment<'a>(&'a self, _key: &'a str, _attribute: &'a str, _by: u64) -> BoxFuture<'a, Result<u64, StorageError>> {
        future::ready(Err(StorageError::Unavailable { description: "connection refused".to_owned() })).boxed()
    }
}

async fn start_server(function: CounterFunction) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, Arc::new(function)));
    addr
}

async fn get(addr: SocketAddr) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET /visitors HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_counter_over_http() {
    let addr = start_server(CounterFunction::new(
        CounterConfig::new("test-visitor-count", "https://example.com").with_store(StoreConfig::Memory)
    )).await;

    let first = get(addr).await;
    assert!(first.starts_with("HTTP/1.1 200 OK"), "unexpected response: {first}");
    assert!(first.to_lowercase().contains("access-control-allow-origin: https://example.com"));
    assert!(first.ends_with("{\"views\":1}"));

    let second = get(addr).await;
    assert!(second.ends_with("{\"views\":2}"));
}

#[tokio::test]
async fn store_failure_is_internal_error() {
    let addr = start_server(CounterFunction::with_store(
        CounterConfig::new("test-visitor-count", "*"),
        BoxedStore::new(UnavailableStore),
    )).await;

    let response = get(addr).await;
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error"), "unexpected response: {response}");
    assert!(!response.contains("views"));
}
